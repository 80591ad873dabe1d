//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, UserId},
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<UserId, TokenRecord>>>;

/// Thread-safe storage backend that keeps records in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of users with a stored token.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no tokens are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl TokenStore for MemoryStore {
	fn put<'a>(&'a self, user: &'a UserId, record: TokenRecord) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(user.clone(), record);

			Ok(())
		})
	}

	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, TokenRecord> {
		let map = self.0.clone();

		Box::pin(async move {
			map.read()
				.get(user)
				.cloned()
				.ok_or_else(|| StoreError::NotFound { user: user.to_string() })
		})
	}
}
