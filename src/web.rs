//! Browser-facing shell: routing, the identity gate, cookies, and HTML pages.
//!
//! Every failure ends in a redirect to `/error?description=<message>`; requests without a
//! usable identity are sent to `/login`.

pub mod cookies;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod session;

pub use error::*;
pub use session::*;

// crates.io
use axum::{
	Router,
	extract::DefaultBodyLimit,
	routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*, config::Config, flows::Broker, studio::StudioTransport, workflow::PollPolicy,
};

/// Largest accepted `/create` body.
pub const MAX_UPLOAD_BYTES: usize = 32 << 20;

/// Application context injected into every handler as axum state.
#[derive(Clone, Debug)]
pub struct AppContext {
	/// Token exchange and persistence.
	pub broker: Broker,
	/// Studio HTTP clients, bound to a user per request.
	pub transport: StudioTransport,
	/// Snapshot polling bounds.
	pub poll: PollPolicy,
	/// Marks cookies `Secure` when the public URL is HTTPS.
	pub secure_cookies: bool,
	/// Cancelled on shutdown; interrupts snapshot polling.
	pub shutdown: CancellationToken,
}
impl AppContext {
	/// Assembles the context from the loaded configuration.
	pub fn new(
		config: &Config,
		broker: Broker,
		transport: StudioTransport,
		shutdown: CancellationToken,
	) -> Self {
		Self {
			broker,
			transport,
			poll: config.poll,
			secure_cookies: config.url.scheme() == "https",
			shutdown,
		}
	}
}

/// Builds the application router.
pub fn router(ctx: AppContext) -> Router {
	Router::new()
		.route("/", get(handlers::home))
		.route(
			"/create",
			post(handlers::create).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
		)
		.route("/finish", post(handlers::finish))
		.route("/login", get(handlers::login))
		.route("/oauth", get(handlers::oauth))
		.route("/callback", get(handlers::callback))
		.route("/error", get(handlers::error_page))
		.route("/style.css", get(handlers::style))
		.layer(TraceLayer::new_for_http())
		.with_state(ctx)
}
