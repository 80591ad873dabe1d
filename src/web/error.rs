//! Request-boundary failures and their redirects.

// crates.io
use axum::response::{IntoResponse, Redirect, Response};
// self
use crate::_prelude::*;

/// Path of the error page.
pub const ERROR_PATH: &str = "/error";
/// Path of the login page.
pub const LOGIN_PATH: &str = "/login";

/// Failure returned by handlers and the identity gate.
#[derive(Debug, ThisError)]
pub enum WebError {
	/// No usable identity; the browser must log in again.
	#[error("Login required.")]
	LoginRequired,
	/// Any other failure; shown on the error page.
	#[error(transparent)]
	Failed(#[from] Error),
}
impl IntoResponse for WebError {
	fn into_response(self) -> Response {
		match self {
			Self::LoginRequired => Redirect::to(LOGIN_PATH).into_response(),
			Self::Failed(e) => {
				tracing::error!(error = %e, "request failed");

				Redirect::to(&error_location(&e.to_string())).into_response()
			},
		}
	}
}

/// Error page location carrying `message` URL-encoded in the `description` query parameter.
pub fn error_location(message: &str) -> String {
	let description: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();

	format!("{ERROR_PATH}?description={description}")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn error_location_encodes_the_message() {
		assert_eq!(
			error_location("404 Not Found not found"),
			"/error?description=404+Not+Found+not+found"
		);
		assert_eq!(error_location("a&b=c/d"), "/error?description=a%26b%3Dc%2Fd");
	}
}
