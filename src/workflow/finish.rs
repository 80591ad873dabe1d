//! Finish: close a session, check the reviewed file back in, flatten it, and share it.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{JobId, ProjectFileId, ProjectId, SessionFileId, SessionId},
	obs::{self, FlowKind},
	studio::{SessionStatus, SharedLink, StudioApi},
	workflow::{PollPolicy, poll_snapshot},
};

/// Revision comment of the checkin.
pub const CHECKIN_COMMENT: &str = "Checkin from Roundtripper";

/// Input of [`finish_session`], as carried by the form rendered after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRequest {
	/// Session to close.
	#[serde(rename = "sessionId")]
	pub session: SessionId,
	/// Project holding the file.
	#[serde(rename = "projectId")]
	pub project: ProjectId,
	/// File inside the session.
	#[serde(rename = "fileSessionId")]
	pub session_file: SessionFileId,
	/// File inside the project.
	#[serde(rename = "fileProjectId")]
	pub project_file: ProjectFileId,
}

/// Result of a finished session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedSession {
	/// Flatten job started on the checked-in file.
	pub job: JobId,
	/// Public link to the file.
	pub link: SharedLink,
}

/// Runs the finish chain.
///
/// Finalizing, snapshot, poll, download, session deletion, checkin, transfer of the snapshot
/// into the checkin upload, checkin confirmation, flatten, and shared link, in that order.
pub async fn finish_session(
	api: &dyn StudioApi,
	request: &FinishRequest,
	policy: &PollPolicy,
	cancel: &CancellationToken,
) -> Result<FinishedSession> {
	obs::observe(FlowKind::Finish, "finish_session", async move {
		let FinishRequest { session, project, session_file, project_file } = request;

		api.set_session_status(session, SessionStatus::Finalizing).await?;

		tracing::info!(%session, "session is finalizing");

		let download_url = async {
			api.start_snapshot(session, *session_file).await?;
			poll_snapshot(api, session, *session_file, policy, cancel).await
		}
		.await
		.inspect_err(|_| {
			tracing::warn!(%session, "left a finalizing session behind");
		})?;
		let snapshot = api.download(&download_url).await.inspect_err(|_| {
			tracing::warn!(%session, "left a finalizing session behind");
		})?;

		tracing::info!(%session, len = snapshot.len, "downloading snapshot");

		api.delete_session(session).await.inspect_err(|_| {
			tracing::warn!(%session, "left a finalizing session behind");
		})?;

		tracing::info!(%session, "deleted session");

		async {
			let upload = api.checkin_project_file(project, *project_file).await?;

			api.upload(&upload, snapshot).await?;
			api.confirm_checkin(project, *project_file, CHECKIN_COMMENT).await
		}
		.await
		.inspect_err(|_| {
			tracing::warn!(
				%project,
				%project_file,
				"session is gone but the reviewed revision was not checked in"
			);
		})?;

		tracing::info!(%project, %project_file, "checked in reviewed revision");

		let job = api.flatten_project_file(project, *project_file).await.inspect_err(|_| {
			tracing::warn!(%project, %project_file, "left a checked-in file without flattening");
		})?;

		tracing::info!(%project, %project_file, %job, "started flatten job");

		let link = api.create_shared_link(project, *project_file).await.inspect_err(|_| {
			tracing::warn!(
				%project,
				%project_file,
				%job,
				"flatten job started without a shared link"
			);
		})?;

		tracing::info!(%project, %project_file, link = %link.share_link, "created shared link");

		Ok(FinishedSession { job, link })
	})
	.await
}
