//! Identity gate: resolves the `userId` cookie into an authenticated Studio client.

// crates.io
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
// self
use crate::{
	_prelude::*,
	auth::UserId,
	studio::StudioClient,
	web::{AppContext, WebError, cookies::USER_COOKIE},
};

/// Authenticated user of a request, with a Studio client bound to their refreshing token.
///
/// Extraction fails with [`WebError::LoginRequired`] when the cookie is absent, no token is
/// stored for it, or the provider no longer accepts the stored refresh token. Any other token
/// failure goes to the error page.
#[derive(Clone, Debug)]
pub struct UserSession {
	/// Identity from the `userId` cookie.
	pub user: UserId,
	/// Studio client authenticated as `user`.
	pub api: StudioClient,
}
impl FromRequestParts<AppContext> for UserSession {
	type Rejection = WebError;

	async fn from_request_parts(
		parts: &mut Parts,
		ctx: &AppContext,
	) -> Result<Self, Self::Rejection> {
		let jar = CookieJar::from_headers(&parts.headers);
		let user = jar
			.get(USER_COOKIE)
			.and_then(|cookie| UserId::new(cookie.value()).ok())
			.ok_or(WebError::LoginRequired)?;
		let source = match ctx.broker.token_source(&user).await {
			Ok(source) => source,
			Err(Error::Storage(e)) if e.is_not_found() => {
				tracing::debug!(%user, "no stored token");

				return Err(WebError::LoginRequired);
			},
			Err(e) => return Err(e.into()),
		};

		// Refreshes (and persists) here when the held token is stale.
		match source.token().await {
			Ok(_) => (),
			Err(Error::InvalidGrant { reason }) => {
				tracing::warn!(%user, %reason, "stored refresh token was rejected");

				return Err(WebError::LoginRequired);
			},
			Err(e) => return Err(e.into()),
		}

		let api = ctx.transport.client(Arc::new(source));

		Ok(Self { user, api })
	}
}
