//! Wire types of the Studio public API.
//!
//! Field names follow the API's PascalCase JSON. Response types only require the fields the
//! workflows read; everything else defaults.

// self
use crate::{
	_prelude::*,
	auth::{JobId, ProjectFileId, ProjectId, SessionFileId, SessionId, SharedLinkId},
};

/// Sessions created by this crate stay open for four weeks.
pub const SESSION_LIFETIME: Duration = Duration::weeks(4);

/// Project visible to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Project {
	/// Display name.
	pub name: String,
	/// Project identifier.
	pub id: ProjectId,
}

/// Response of `GET projects`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectList {
	/// Projects on this page.
	#[serde(default)]
	pub projects: Vec<Project>,
	/// Total number of projects.
	#[serde(default)]
	pub total_count: u64,
}

/// Body of `POST projects/{project}/files`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewProjectFile<'a> {
	/// File name as shown in the project.
	pub name: &'a str,
	/// Parent folder, `0` for the project root.
	#[serde(rename = "ProjectFolderId")]
	pub project_folder_id: u64,
}

/// Upload descriptor returned when a project file is created or checked in.
///
/// The upload URL is pre-signed and valid for one transfer only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingUpload {
	/// Project file the upload belongs to.
	pub id: ProjectFileId,
	/// One-time upload URL.
	pub upload_url: String,
	/// Content type the upload must be sent with.
	pub upload_content_type: String,
}

/// Checkin response; its `Id` is unreliable and never read.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckinUpload {
	/// One-time upload URL for the new revision.
	pub upload_url: String,
	/// Content type the upload must be sent with.
	pub upload_content_type: String,
}
impl CheckinUpload {
	/// Binds the descriptor to the file the caller checked in.
	pub fn into_upload(self, file: ProjectFileId) -> PendingUpload {
		PendingUpload {
			id: file,
			upload_url: self.upload_url,
			upload_content_type: self.upload_content_type,
		}
	}
}

/// Session permission types granted by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionType {
	/// Attendees may save a copy.
	SaveCopy,
	/// Attendees may print a copy.
	PrintCopy,
	/// Attendees may add markups.
	Markup,
	/// Attendees are alerted about markups.
	MarkupAlert,
	/// Attendees may add documents.
	AddDocuments,
}

/// Permission setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionValue {
	/// Granted.
	Allow,
	/// Refused.
	Deny,
	/// Inherited from the session defaults.
	Default,
}

/// One entry of [`NewSession::default_permissions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionPermission {
	/// Permission being set.
	#[serde(rename = "Type")]
	pub kind: PermissionType,
	/// Value of the permission.
	pub allow: PermissionValue,
}

/// Body of `POST sessions`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewSession<'a> {
	/// Session name.
	pub name: &'a str,
	/// Notify attendees about activity.
	pub notification: bool,
	/// Restrict the session to invited attendees.
	pub restricted: bool,
	/// Instant the session closes on its own.
	#[serde(with = "time::serde::rfc3339")]
	pub session_end_date: OffsetDateTime,
	/// Permissions every attendee receives.
	pub default_permissions: Vec<SessionPermission>,
}
impl<'a> NewSession<'a> {
	/// Builds the request used by the create workflow: notifications on, unrestricted,
	/// every default permission allowed, closing [`SESSION_LIFETIME`] after `now`.
	pub fn new(name: &'a str, now: OffsetDateTime) -> Self {
		let default_permissions = [
			PermissionType::SaveCopy,
			PermissionType::PrintCopy,
			PermissionType::Markup,
			PermissionType::MarkupAlert,
			PermissionType::AddDocuments,
		]
		.into_iter()
		.map(|kind| SessionPermission { kind, allow: PermissionValue::Allow })
		.collect();

		Self {
			name,
			notification: true,
			restricted: false,
			session_end_date: now + SESSION_LIFETIME,
			default_permissions,
		}
	}
}

/// Response of `POST sessions`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCreated {
	/// New session identifier.
	pub id: SessionId,
}

/// Lifecycle status of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// Open for review.
	Active,
	/// Closing; attendees are removed.
	Finalizing,
	/// Closed.
	Closed,
	/// Failed on the server side.
	Error,
	/// Any status this crate does not know about.
	#[default]
	#[serde(other)]
	Unknown,
}

/// Body of `PUT sessions/{session}`.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionUpdate {
	/// New status.
	pub status: SessionStatus,
}

/// Session as returned by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
	/// Session identifier.
	pub id: SessionId,
	/// Session name.
	#[serde(default)]
	pub name: String,
	/// Whether the session is restricted.
	#[serde(default)]
	pub restricted: bool,
	/// Scheduled end, as sent by the API.
	#[serde(default)]
	pub session_end_date: Option<String>,
	/// Invitation link.
	#[serde(default)]
	pub invite_url: Option<String>,
	/// Owner email.
	#[serde(default)]
	pub owner_email: Option<String>,
	/// Current status.
	#[serde(default)]
	pub status: SessionStatus,
}

/// Body of `POST projects/{project}/files/{file}/checkout-to-session`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckoutRequest<'a> {
	/// Target session.
	#[serde(rename = "SessionId")]
	pub session_id: &'a SessionId,
}

/// Response of the checkout call.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckoutResponse {
	/// Session the file was checked out into.
	#[serde(rename = "SessionId", default)]
	pub session_id: Option<SessionId>,
	/// Identifier of the file inside the session.
	pub id: SessionFileId,
}

/// Status of a snapshot job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotStatus {
	/// The download URL is ready.
	Complete,
	/// The snapshot failed.
	Error,
	/// Any non-terminal status.
	#[serde(other)]
	Pending,
}

/// Response of `GET sessions/{session}/files/{file}/snapshot`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Snapshot {
	/// Job status.
	pub status: SnapshotStatus,
	/// Time of the last status change.
	#[serde(default)]
	pub status_time: Option<String>,
	/// Time of the last completed snapshot.
	#[serde(rename = "StatusSnapshotTime", default)]
	pub last_snapshot_time: Option<String>,
	/// One-time download URL, set once the job is complete.
	#[serde(default)]
	pub download_url: Option<String>,
}

/// Body of `POST projects/{project}/files/{file}/confirm-checkin`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckinRequest<'a> {
	/// Revision comment.
	pub comment: &'a str,
}

/// Markup kinds baked into the page by a flatten job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[allow(missing_docs)]
pub struct FlattenOptions {
	pub image: bool,
	pub ellipse: bool,
	pub stamp: bool,
	pub snapshot: bool,
	pub text_and_callout: bool,
	pub ink_and_highlighter: bool,
	pub line_and_dimension: bool,
	pub measure_area: bool,
	pub polyline: bool,
	pub polygon_and_cloud: bool,
	pub rectangle: bool,
	pub text_markups: bool,
	pub group: bool,
	pub file_attachment: bool,
	pub flags: bool,
	pub notes: bool,
	pub form_fields: bool,
}
impl FlattenOptions {
	/// Every markup kind enabled.
	pub const fn all() -> Self {
		Self {
			image: true,
			ellipse: true,
			stamp: true,
			snapshot: true,
			text_and_callout: true,
			ink_and_highlighter: true,
			line_and_dimension: true,
			measure_area: true,
			polyline: true,
			polygon_and_cloud: true,
			rectangle: true,
			text_markups: true,
			group: true,
			file_attachment: true,
			flags: true,
			notes: true,
			form_fields: true,
		}
	}
}

/// Body of `POST projects/{project}/files/{file}/jobs/flatten`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlattenJob {
	/// Keep the pre-flatten revision recoverable.
	pub recoverable: bool,
	/// Pages to flatten, `-1` for all.
	pub page_range: String,
	/// Markup kinds to flatten.
	pub options: FlattenOptions,
	/// Job priority.
	pub priority: u32,
}
impl Default for FlattenJob {
	fn default() -> Self {
		Self {
			recoverable: true,
			page_range: "-1".into(),
			options: FlattenOptions::all(),
			priority: 0,
		}
	}
}

/// Response of job creation calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobCreated {
	/// Job identifier.
	pub id: JobId,
}

/// Body of `POST projects/{project}/sharedlinks`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedLinkRequest {
	/// File to share.
	#[serde(rename = "ProjectFileID")]
	pub project_file_id: ProjectFileId,
	/// Require a password.
	pub password_protected: bool,
	/// Password, empty when unprotected.
	pub password: String,
	/// Expiry, empty for none.
	pub expires: String,
	/// Serve a flattened copy.
	pub flatten: bool,
}
impl SharedLinkRequest {
	/// Unprotected, non-expiring link to `file`.
	pub fn public(file: ProjectFileId) -> Self {
		Self {
			project_file_id: file,
			password_protected: false,
			password: String::new(),
			expires: String::new(),
			flatten: false,
		}
	}
}

/// Shared link created for a project file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedLink {
	/// Link identifier.
	pub id: SharedLinkId,
	/// Public URL.
	pub share_link: String,
}
