//! Cookie builders for the OAuth state nonce and the user identity.

// crates.io
use axum_extra::extract::cookie::{Cookie, SameSite};
// self
use crate::{_prelude::*, auth::UserId};

/// CSRF nonce cookie, set by `/login` and checked by `/callback`.
pub const STATE_COOKIE: &str = "state";
/// Identity cookie, set after a successful callback.
pub const USER_COOKIE: &str = "userId";

const USER_COOKIE_TTL: Duration = Duration::days(30);

/// Creates the state cookie.
pub fn state_cookie(state: String, secure: bool) -> Cookie<'static> {
	Cookie::build((STATE_COOKIE, state))
		.http_only(true)
		.secure(secure)
		.same_site(SameSite::Lax)
		.path("/")
		.build()
}

/// Creates the removal cookie for the state nonce.
pub fn clear_state_cookie() -> Cookie<'static> {
	Cookie::build((STATE_COOKIE, "")).path("/").max_age(Duration::ZERO).build()
}

/// Creates the identity cookie, valid for 30 days.
pub fn user_cookie(user: &UserId, secure: bool) -> Cookie<'static> {
	Cookie::build((USER_COOKIE, user.to_string()))
		.http_only(true)
		.secure(secure)
		.same_site(SameSite::Lax)
		.path("/")
		.max_age(USER_COOKIE_TTL)
		.build()
}
