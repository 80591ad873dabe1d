//! Crate-level error types shared across token flows, the Studio client, and workflows.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every workflow step propagates the first failure unmodified, so the `Display` output of
/// this type is exactly what the browser sees on the error page.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary token endpoint failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Workflow-level failure that is not tied to a single HTTP exchange.
	#[error(transparent)]
	Workflow(#[from] WorkflowError),
	/// Login or callback failure.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),

	/// Remote API answered with a status of 400 or above.
	#[error("{status} {body}")]
	Rejected {
		/// Status line, e.g. `404 Not Found`.
		status: String,
		/// Raw response body.
		body: String,
	},
	/// Remote API answered with a payload that does not match the expected shape.
	#[error("Remote API returned malformed JSON for {operation}: {source}.")]
	Decode {
		/// Operation label.
		operation: &'static str,
		/// Structured parsing failure, including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider rejected the grant (bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured URL cannot be parsed.
	#[error("Configured {name} URL is invalid.")]
	InvalidUrl {
		/// Configuration key.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL cannot carry path segments.
	#[error("Configured URL `{url}` cannot be used as a base.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// A required setting is absent from both the config file and the environment.
	#[error("Missing required setting `{key}`.")]
	MissingSetting {
		/// File key or environment variable.
		key: &'static str,
	},
	/// A setting that must be positive is zero.
	#[error("Setting `{key}` must be greater than zero.")]
	ZeroSetting {
		/// File key.
		key: &'static str,
	},
	/// Config file exists but could not be read.
	#[error("Unable to read config file {path}.")]
	ReadFile {
		/// Path that was read.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Config file is not valid JSON.
	#[error("Config file {path} is malformed.")]
	ParseFile {
		/// Path that was parsed.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Cached record is missing a refresh secret.
	#[error("Cached token record is missing a refresh token.")]
	MissingRefreshToken,
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token endpoint failures that are not a rejection of the grant itself.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}: {source}")]
	Network {
		/// Short label of the remote endpoint.
		target: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		target: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target, source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network("the remote API", e)
	}
}

/// Multi-step workflow failures.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum WorkflowError {
	/// The snapshot job reached its terminal error status.
	#[error("Snapshot error")]
	SnapshotFailed,
	/// The snapshot completed without a download URL.
	#[error("Snapshot completed without a download URL.")]
	MissingDownloadUrl,
	/// Polling gave up before the snapshot reached a terminal status.
	#[error("Snapshot did not finish after {attempts} status checks.")]
	PollExhausted {
		/// Number of status calls issued.
		attempts: u32,
	},
	/// The wait between polls was cancelled.
	#[error("Snapshot polling was cancelled.")]
	Cancelled,
	/// A transfer source did not announce its length.
	#[error("Snapshot download did not report a content length.")]
	UnknownContentLength,
	/// The multipart upload was missing a field.
	#[error("Form field `{field}` is missing.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// A submitted form could not be read or carried an unusable value.
	#[error("Form is invalid: {0}")]
	InvalidForm(String),
}

/// OAuth login and callback failures.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum AuthorizationError {
	/// The `state` query value does not match the `state` cookie.
	#[error("Authorization Error")]
	StateMismatch,
	/// The `state` cookie is absent.
	#[error("The state cookie is missing; start again from the login page.")]
	MissingState,
	/// The callback carried no authorization code.
	#[error("The callback is missing the authorization code.")]
	MissingCode,
	/// The provider redirected back with an error.
	#[error("{0}")]
	Provider(String),
	/// The token response carries no user identity claim.
	#[error("Token response is missing the `{claim}` claim.")]
	MissingIdentity {
		/// Claim name.
		claim: &'static str,
	},
	/// The identity claim is not a usable identifier.
	#[error("Token identity is invalid: {0}")]
	InvalidIdentity(#[from] crate::auth::IdentifierError),
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejected_message_keeps_status_and_body_verbatim() {
		let err = Error::Rejected { status: "404 Not Found".into(), body: "not found".into() };

		assert_eq!(err.to_string(), "404 Not Found not found");
	}

	#[test]
	fn nested_errors_display_transparently() {
		let err: Error = WorkflowError::SnapshotFailed.into();

		assert_eq!(err.to_string(), "Snapshot error");

		let err: Error = AuthorizationError::StateMismatch.into();

		assert_eq!(err.to_string(), "Authorization Error");
	}
}
