//! HTTP implementation of [`StudioApi`].

// crates.io
use reqwest::{
	Method, RequestBuilder, Response,
	header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{JobId, ProjectFileId, ProjectId, SessionFileId, SessionId},
	config::Config,
	error::{ConfigError, TransportError, WorkflowError},
	flows::TokenProvider,
	http,
	studio::{
		ApiFuture, CheckinRequest, CheckinUpload, CheckoutRequest, CheckoutResponse, FlattenJob,
		JobCreated, NewProjectFile, NewSession, PendingUpload, ProjectList, Session,
		SessionCreated, SessionStatus, SessionUpdate, SharedLink, SharedLinkRequest, Snapshot,
		StudioApi, TransferBody,
	},
};

const API_TARGET: &str = "the Studio API";
const TRANSFER_TARGET: &str = "a pre-signed transfer URL";
const SERVER_SIDE_ENCRYPTION: &str = "x-amz-server-side-encryption";

/// Process-wide HTTP clients and the API base; cheap to clone per request.
#[derive(Clone, Debug)]
pub struct StudioTransport {
	api: ReqwestClient,
	transfer: ReqwestClient,
	base: Url,
}
impl StudioTransport {
	/// Builds the transport with per-call deadlines for API calls and transfers.
	pub fn new(
		base: Url,
		request_timeout: StdDuration,
		transfer_timeout: StdDuration,
	) -> Result<Self, ConfigError> {
		if base.cannot_be_a_base() {
			return Err(ConfigError::CannotBeABase { url: base.to_string() });
		}

		Ok(Self {
			api: http::api_client(request_timeout)?,
			transfer: http::transfer_client(transfer_timeout)?,
			base,
		})
	}

	/// Builds the transport from the loaded configuration.
	pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
		Self::new(config.api_base.clone(), config.request_timeout, config.transfer_timeout)
	}

	/// Binds the transport to a token provider.
	pub fn client(&self, tokens: Arc<dyn TokenProvider>) -> StudioClient {
		StudioClient { transport: self.clone(), tokens }
	}

	fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: self.base.to_string() })?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}
}

/// [`StudioApi`] client authenticated through a [`TokenProvider`].
#[derive(Clone)]
pub struct StudioClient {
	transport: StudioTransport,
	tokens: Arc<dyn TokenProvider>,
}
impl StudioClient {
	async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
		let token = self.tokens.access_token().await?;

		tracing::debug!(operation, "calling the Studio API");

		let response = request
			.bearer_auth(token.expose())
			.send()
			.await
			.map_err(|e| TransportError::network(API_TARGET, e))?;

		check_response(response).await
	}

	async fn call<T>(&self, operation: &'static str, request: RequestBuilder) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send(operation, request).await?;

		decode(operation, response).await
	}

	fn request(&self, method: Method, url: Url) -> RequestBuilder {
		self.transport.api.request(method, url)
	}

	fn json_request<B>(&self, method: Method, url: Url, body: &B) -> Result<RequestBuilder>
	where
		B: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(body).map_err(ConfigError::RequestBody)?;

		Ok(self.request(method, url).header(CONTENT_TYPE, "application/json").body(body))
	}
}
impl StudioApi for StudioClient {
	fn list_projects(&self) -> ApiFuture<'_, ProjectList> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["projects"])?;

			self.call("list projects", self.request(Method::GET, url)).await
		})
	}

	fn start_file_upload<'a>(
		&'a self,
		project: &'a ProjectId,
		file_name: &'a str,
	) -> ApiFuture<'a, PendingUpload> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["projects", project, "files"])?;
			let body = NewProjectFile { name: file_name, project_folder_id: 0 };

			self.call("start file upload", self.json_request(Method::POST, url, &body)?).await
		})
	}

	fn upload<'a>(&'a self, upload: &'a PendingUpload, body: TransferBody) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			tracing::debug!(file = %upload.id, len = body.len, "uploading to pre-signed URL");

			let response = self
				.transport
				.transfer
				.put(&upload.upload_url)
				.header(CONTENT_TYPE, &upload.upload_content_type)
				.header(SERVER_SIDE_ENCRYPTION, "AES256")
				.header(CONTENT_LENGTH, body.len)
				.body(body.body)
				.send()
				.await
				.map_err(|e| TransportError::network(TRANSFER_TARGET, e))?;

			check_response(response).await?;

			Ok(())
		})
	}

	fn confirm_upload<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			let file = file.to_string();
			let url = self.transport.endpoint(&[
				"projects",
				project,
				"files",
				&file,
				"confirm-upload",
			])?;

			self.send("confirm upload", self.request(Method::POST, url)).await?;

			Ok(())
		})
	}

	fn create_session<'a>(&'a self, name: &'a str) -> ApiFuture<'a, SessionId> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["sessions"])?;
			let body = NewSession::new(name, OffsetDateTime::now_utc());
			let created: SessionCreated =
				self.call("create session", self.json_request(Method::POST, url, &body)?).await?;

			Ok(created.id)
		})
	}

	fn checkout_to_session<'a>(
		&'a self,
		session: &'a SessionId,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, SessionFileId> {
		Box::pin(async move {
			let file = file.to_string();
			let url = self.transport.endpoint(&[
				"projects",
				project,
				"files",
				&file,
				"checkout-to-session",
			])?;
			let body = CheckoutRequest { session_id: session };
			let checkout: CheckoutResponse = self
				.call("checkout to session", self.json_request(Method::POST, url, &body)?)
				.await?;

			Ok(checkout.id)
		})
	}

	fn set_session_status<'a>(
		&'a self,
		session: &'a SessionId,
		status: SessionStatus,
	) -> ApiFuture<'a, Session> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["sessions", session])?;
			let body = SessionUpdate { status };

			self.call("set session status", self.json_request(Method::PUT, url, &body)?).await
		})
	}

	fn start_snapshot<'a>(
		&'a self,
		session: &'a SessionId,
		file: SessionFileId,
	) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			let file = file.to_string();
			let url =
				self.transport.endpoint(&["sessions", session, "files", &file, "snapshot"])?;

			self.send("start snapshot", self.request(Method::POST, url)).await?;

			Ok(())
		})
	}

	fn snapshot_status<'a>(
		&'a self,
		session: &'a SessionId,
		file: SessionFileId,
	) -> ApiFuture<'a, Snapshot> {
		Box::pin(async move {
			let file = file.to_string();
			let url =
				self.transport.endpoint(&["sessions", session, "files", &file, "snapshot"])?;

			self.call("snapshot status", self.request(Method::GET, url)).await
		})
	}

	fn download<'a>(&'a self, url: &'a str) -> ApiFuture<'a, TransferBody> {
		Box::pin(async move {
			let response = self
				.transport
				.transfer
				.get(url)
				.send()
				.await
				.map_err(|e| TransportError::network(TRANSFER_TARGET, e))?;
			let response = check_response(response).await?;
			let len = response.content_length().ok_or(WorkflowError::UnknownContentLength)?;

			Ok(TransferBody::new(reqwest::Body::wrap_stream(response.bytes_stream()), len))
		})
	}

	fn delete_session<'a>(&'a self, session: &'a SessionId) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["sessions", session])?;

			self.send("delete session", self.request(Method::DELETE, url)).await?;

			Ok(())
		})
	}

	fn checkin_project_file<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, PendingUpload> {
		Box::pin(async move {
			let file_segment = file.to_string();
			let url = self.transport.endpoint(&[
				"projects",
				project,
				"files",
				&file_segment,
				"checkin",
			])?;
			let upload: CheckinUpload =
				self.call("checkin project file", self.request(Method::POST, url)).await?;

			Ok(upload.into_upload(file))
		})
	}

	fn confirm_checkin<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
		comment: &'a str,
	) -> ApiFuture<'a, ()> {
		Box::pin(async move {
			let file = file.to_string();
			let url = self.transport.endpoint(&[
				"projects",
				project,
				"files",
				&file,
				"confirm-checkin",
			])?;
			let body = CheckinRequest { comment };

			self.send("confirm checkin", self.json_request(Method::POST, url, &body)?).await?;

			Ok(())
		})
	}

	fn flatten_project_file<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, JobId> {
		Box::pin(async move {
			let file = file.to_string();
			let url = self.transport.endpoint(&[
				"projects", project, "files", &file, "jobs", "flatten",
			])?;
			let job: JobCreated = self
				.call(
					"flatten project file",
					self.json_request(Method::POST, url, &FlattenJob::default())?,
				)
				.await?;

			Ok(job.id)
		})
	}

	fn create_shared_link<'a>(
		&'a self,
		project: &'a ProjectId,
		file: ProjectFileId,
	) -> ApiFuture<'a, SharedLink> {
		Box::pin(async move {
			let url = self.transport.endpoint(&["projects", project, "sharedlinks"])?;
			let body = SharedLinkRequest::public(file);

			self.call("create shared link", self.json_request(Method::POST, url, &body)?).await
		})
	}
}
impl Debug for StudioClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StudioClient").field("base", &self.transport.base.as_str()).finish()
	}
}

/// Fails with [`Error::Rejected`] (status line + raw body) when the status is 400 or above.
pub async fn check_response(response: Response) -> Result<Response> {
	let status = response.status();

	if status.as_u16() < 400 {
		return Ok(response);
	}

	let body = response.text().await.map_err(|e| TransportError::network(API_TARGET, e))?;

	Err(Error::Rejected { status: status.to_string(), body })
}

async fn decode<T>(operation: &'static str, response: Response) -> Result<T>
where
	T: DeserializeOwned,
{
	let bytes = response.bytes().await.map_err(|e| TransportError::network(API_TARGET, e))?;
	let mut deserializer = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { operation, source })
}
