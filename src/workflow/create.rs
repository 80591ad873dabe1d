//! Create: upload a file into a project and open a review session on it.

// self
use crate::{
	_prelude::*,
	auth::{ProjectFileId, ProjectId, SessionFileId, SessionId},
	obs::{self, FlowKind},
	studio::{StudioApi, TransferBody},
};

/// Input of [`create_session`].
#[derive(Debug)]
pub struct CreateRequest {
	/// Project receiving the file.
	pub project: ProjectId,
	/// Name of the new session.
	pub session_name: String,
	/// Name of the uploaded file.
	pub file_name: String,
	/// File content.
	pub file: TransferBody,
}

/// Identifiers the browser needs to finish the session later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
	/// Session name.
	pub session_name: String,
	/// New session.
	pub session: SessionId,
	/// Project holding the file.
	pub project: ProjectId,
	/// File inside the session.
	pub session_file: SessionFileId,
	/// File inside the project.
	pub project_file: ProjectFileId,
}

/// Uploads the file, confirms it, creates the session, and checks the file out into it.
pub async fn create_session(
	api: &dyn StudioApi,
	request: CreateRequest,
) -> Result<CreatedSession> {
	obs::observe(FlowKind::Create, "create_session", async move {
		let CreateRequest { project, session_name, file_name, file } = request;

		tracing::info!(%project, file = %file_name, len = file.len, "starting file upload");

		let upload = api.start_file_upload(&project, &file_name).await?;

		api.upload(&upload, file).await.inspect_err(|_| {
			tracing::warn!(%project, project_file = %upload.id, "left an empty project file behind");
		})?;
		api.confirm_upload(&project, upload.id).await.inspect_err(|_| {
			tracing::warn!(
				%project,
				project_file = %upload.id,
				"left an unconfirmed project file behind"
			);
		})?;

		tracing::info!(%project, project_file = %upload.id, "uploaded file");

		let session = api.create_session(&session_name).await.inspect_err(|_| {
			tracing::warn!(
				%project,
				project_file = %upload.id,
				"left an uploaded project file behind"
			);
		})?;
		let session_file =
			api.checkout_to_session(&session, &project, upload.id).await.inspect_err(|_| {
				tracing::warn!(
					%project,
					project_file = %upload.id,
					%session,
					"left an uploaded project file and an empty session behind"
				);
			})?;

		tracing::info!(%session, %session_file, "checked file out into session");

		Ok(CreatedSession { session_name, session, project, session_file, project_file: upload.id })
	})
	.await
}
