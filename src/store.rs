//! Token store contract and the built-in file and memory backends.
//!
//! The store keeps exactly one [`TokenRecord`] per [`UserId`]. Writes overwrite, never append,
//! because refresh tokens are one-time use and only the newest record is valid.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, UserId},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence capability for per-user OAuth tokens.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the token for `user`.
	fn put<'a>(&'a self, user: &'a UserId, record: TokenRecord) -> StoreFuture<'a, ()>;

	/// Fetches the token for `user`, failing with [`StoreError::NotFound`] when absent.
	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, TokenRecord>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// No token is stored for the user.
	#[error("Token Not Found: {user}")]
	NotFound {
		/// Identity that was looked up.
		user: String,
	},
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Returns `true` for [`StoreError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("disk unavailable"));

		let source =
			StdError::source(&err).expect("Crate error should expose the store error as source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn not_found_names_the_user() {
		let err = StoreError::NotFound { user: "jane@example.com".into() };

		assert!(err.is_not_found());
		assert_eq!(err.to_string(), "Token Not Found: jane@example.com");
	}
}
