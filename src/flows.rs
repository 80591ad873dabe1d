//! Token flows: the authorization-code login and the refreshing token source.
//!
//! [`Broker`] owns the two injected capabilities (the [`OAuthFacade`] and the
//! [`TokenStore`]) plus the per-user refresh guards. Every token it obtains is persisted
//! before it is handed to a caller, because Studio refresh tokens are one-time use and a token
//! that never reaches the store locks the user out at the next refresh.

pub mod authorize;
pub mod source;

pub use authorize::*;
pub use source::*;

// self
use crate::{_prelude::*, auth::UserId, oauth::OAuthFacade, store::TokenStore};

/// Coordinates token exchanges and persistence for every user.
#[derive(Clone)]
pub struct Broker {
	/// Exchange capability (authorization server).
	pub oauth: Arc<dyn OAuthFacade>,
	/// Persistence capability.
	pub store: Arc<dyn TokenStore>,
	refresh_guards: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}
impl Broker {
	/// Clock-skew leeway: a token is only used while `now + LEEWAY < expires_at`.
	pub const LEEWAY: Duration = Duration::seconds(10);

	/// Creates a broker over the provided exchange and persistence capabilities.
	pub fn new(oauth: Arc<dyn OAuthFacade>, store: Arc<dyn TokenStore>) -> Self {
		Self { oauth, store, refresh_guards: Default::default() }
	}

	/// Returns (and creates on demand) the single-flight refresh guard for `user`.
	pub(crate) fn refresh_guard(&self, user: &UserId) -> Arc<AsyncMutex<()>> {
		let mut guards = self.refresh_guards.lock();

		guards.entry(user.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker").field("refresh_guards", &self.refresh_guards.lock().len()).finish()
	}
}
