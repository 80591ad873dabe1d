//! Studio public API: wire types, the [`StudioApi`] capability, and its HTTP client.

pub mod client;
pub mod model;

pub use client::*;
pub use model::*;

// crates.io
use axum::body::Bytes;
// self
use crate::{
	_prelude::*,
	auth::{JobId, ProjectFileId, ProjectId, SessionFileId, SessionId},
};

/// Boxed future returned by [`StudioApi`] operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Byte stream with a known length, moved between pre-signed URLs.
pub struct TransferBody {
	/// Request or response body.
	pub body: reqwest::Body,
	/// Exact length in bytes.
	pub len: u64,
}
impl TransferBody {
	/// Wraps a body of `len` bytes.
	pub fn new(body: impl Into<reqwest::Body>, len: u64) -> Self {
		Self { body: body.into(), len }
	}

	/// Wraps an in-memory buffer.
	pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
		let bytes = bytes.into();
		let len = bytes.len() as u64;

		Self { body: bytes.into(), len }
	}
}
impl Debug for TransferBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TransferBody").field("len", &self.len).finish_non_exhaustive()
	}
}

/// Authenticated operations against the Studio API.
///
/// Every call maps a status of 400 or above to [`Error::Rejected`] and a malformed payload to
/// [`Error::Decode`].
pub trait StudioApi
where
	Self: Send + Sync,
{
	/// Lists the projects visible to the user.
	fn list_projects(&self) -> ApiFuture<'_, ProjectList>;

	/// Creates a project file and returns its one-time upload descriptor.
	fn start_file_upload<'a>(
		&'a self,
		project: &'a ProjectId,
		file_name: &'a str,
	) -> ApiFuture<'a, PendingUpload>;

	/// Sends `body` to the pre-signed upload URL of `upload`.
	fn upload<'a>(&'a self, upload: &'a PendingUpload, body: TransferBody) -> ApiFuture<'a, ()>;

	/// Confirms a finished upload.
	fn confirm_upload<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, ()>;

	/// Creates a review session named `name`.
	fn create_session<'a>(&'a self, name: &'a str) -> ApiFuture<'a, SessionId>;

	/// Checks a project file out into a session.
	fn checkout_to_session<'a>(
		&'a self,
		session: &'a SessionId,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, SessionFileId>;

	/// Changes the status of a session.
	fn set_session_status<'a>(
		&'a self,
		session: &'a SessionId,
		status: SessionStatus,
	) -> ApiFuture<'a, Session>;

	/// Starts a snapshot of a session file.
	fn start_snapshot<'a>(&'a self, session: &'a SessionId, file: SessionFileId)
	-> ApiFuture<'a, ()>;

	/// Reads the snapshot job status.
	fn snapshot_status<'a>(
		&'a self,
		session: &'a SessionId,
		file: SessionFileId,
	) -> ApiFuture<'a, Snapshot>;

	/// Opens the one-time download URL of a finished snapshot.
	fn download<'a>(&'a self, url: &'a str) -> ApiFuture<'a, TransferBody>;

	/// Deletes a session.
	fn delete_session<'a>(&'a self, session: &'a SessionId) -> ApiFuture<'a, ()>;

	/// Starts a checkin and returns the upload descriptor for the new revision.
	///
	/// The descriptor's ID is always `file`, whatever the response carried.
	fn checkin_project_file<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, PendingUpload>;

	/// Confirms a checkin with a revision comment.
	fn confirm_checkin<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
		comment: &'a str,
	) -> ApiFuture<'a, ()>;

	/// Starts a flatten job for a project file.
	fn flatten_project_file<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, JobId>;

	/// Creates a public shared link for a project file.
	fn create_shared_link<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, SharedLink>;
}
