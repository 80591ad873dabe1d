//! Durable, file-backed [`TokenStore`].
//!
//! The file holds a single `tokens` bucket mapping user identity to the serialized record.
//! Every mutation rewrites the file through a temp file + fsync + rename, so a crash leaves
//! either the old or the new snapshot on disk. The disk write runs on the blocking pool; writers
//! queue on an async lock so snapshots land in mutation order.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, UserId},
	store::{StoreError, StoreFuture, TokenStore},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
	#[serde(default)]
	tokens: BTreeMap<String, TokenRecord>,
}

/// Persists token records to a JSON file after each write.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
	writer: Arc<AsyncMutex<()>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		// Fail at open time, not on the first login, when the location is not writable.
		write_atomic(&path, &serialize(&snapshot)?)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)), writer: Default::default() })
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Snapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn restore(&self, user: &UserId, previous: Option<TokenRecord>) {
		let mut guard = self.inner.write();

		match previous {
			Some(previous) => guard.tokens.insert(user.to_string(), previous),
			None => guard.tokens.remove(user.as_ref()),
		};
	}
}
impl TokenStore for FileStore {
	fn put<'a>(&'a self, user: &'a UserId, record: TokenRecord) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let _writer = self.writer.lock().await;
			let (bytes, previous) = {
				let mut guard = self.inner.write();
				let previous = guard.tokens.insert(user.to_string(), record);

				(serialize(&guard), previous)
			};
			let written = match bytes {
				Ok(bytes) => {
					let path = self.path.clone();

					tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
						.await
						.unwrap_or_else(|e| {
							Err(StoreError::Backend {
								message: format!("Token store writer stopped: {e}"),
							})
						})
				},
				Err(e) => Err(e),
			};

			if let Err(e) = written {
				// Keep memory and disk in agreement when the write fails.
				self.restore(user, previous);

				return Err(e);
			}

			Ok(())
		})
	}

	fn get<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, TokenRecord> {
		Box::pin(async move {
			self.inner
				.read()
				.tokens
				.get(user.as_ref())
				.cloned()
				.ok_or_else(|| StoreError::NotFound { user: user.to_string() })
		})
	}
}

fn serialize(snapshot: &Snapshot) -> Result<Vec<u8>, StoreError> {
	serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize token snapshot: {e}"),
	})
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
	let mut tmp_path = path.to_path_buf();

	tmp_path.set_extension("tmp");

	{
		let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
			message: format!("Failed to create {}: {e}", tmp_path.display()),
		})?;

		file.write_all(bytes).map_err(|e| StoreError::Backend {
			message: format!("Failed to write {}: {e}", tmp_path.display()),
		})?;
		file.sync_all().map_err(|e| StoreError::Backend {
			message: format!("Failed to sync {}: {e}", tmp_path.display()),
		})?;
	}

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"roundtripper_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_record(user: &UserId, access: &str) -> TokenRecord {
		TokenRecord::builder(user.clone())
			.access_token(access)
			.refresh_token(format!("{access}-refresh"))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test record.")
	}

	#[test]
	fn put_overwrites_and_survives_reopen() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let user = UserId::new("jane@example.com").expect("User fixture should be valid.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.put(&user, build_record(&user, "first")))
			.expect("Failed to save first record.");
		rt.block_on(store.put(&user, build_record(&user, "second")))
			.expect("Failed to save second record.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");
		let fetched =
			rt.block_on(reopened.get(&user)).expect("Record should survive a reopen of the store.");

		assert_eq!(fetched.access_token.expose(), "second");
		assert_eq!(reopened.inner.read().tokens.len(), 1);

		let raw = fs::read_to_string(&path).expect("Store file should be readable.");
		let parsed: serde_json::Value =
			serde_json::from_str(&raw).expect("Store file should contain JSON.");

		assert!(parsed["tokens"]["jane@example.com"].is_object());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store {}: {e}", path.display())
		});
	}

	#[tokio::test]
	async fn concurrent_puts_all_reach_the_disk() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let users: Vec<UserId> = (0..8)
			.map(|i| UserId::new(format!("user-{i}")).expect("User fixture should be valid."))
			.collect();
		let mut tasks = Vec::new();

		for user in users.clone() {
			let store = store.clone();

			tasks.push(tokio::spawn(async move {
				let record = build_record(&user, user.as_ref());

				store.put(&user, record).await
			}));
		}
		for task in tasks {
			task.await.expect("Put task should not panic.").expect("Put should persist.");
		}

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");

		for user in &users {
			let fetched = reopened.get(user).await.expect("Every user should be persisted.");

			assert_eq!(fetched.access_token.expose(), user.as_ref());
		}

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn get_reports_missing_users() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let user = UserId::new("nobody").expect("User fixture should be valid.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let err = rt.block_on(store.get(&user)).expect_err("Unknown users should be reported.");

		assert!(err.is_not_found());

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn open_rejects_corrupt_files() {
		let path = temp_path();

		fs::write(&path, b"{not json").expect("Failed to write corrupt fixture.");

		let err = FileStore::open(&path).expect_err("Corrupt store files must fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		let _ = fs::remove_file(&path);
	}
}
