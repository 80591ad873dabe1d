//! Route handlers.

// crates.io
use axum::{
	Form,
	extract::{
		Multipart, Query, State,
		multipart::{Field, MultipartError},
		rejection::FormRejection,
	},
	http::header::CONTENT_TYPE,
	response::{Html, IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	error::{AuthorizationError, WorkflowError},
	flows::{Broker, CallbackParams},
	studio::{StudioApi, TransferBody},
	web::{AppContext, UserSession, WebError, cookies, pages},
	workflow::{self, CreateRequest, FinishRequest},
};

/// Query of `/error`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorQuery {
	/// Message to show.
	#[serde(default)]
	pub description: String,
}

/// `GET /`: lists the user's projects next to the upload form.
pub async fn home(session: UserSession) -> Result<Html<String>, WebError> {
	let projects = session.api.list_projects().await?;

	tracing::info!(user = %session.user, projects = projects.projects.len(), "listed projects");

	Ok(Html(pages::home(&session.user, &projects)))
}

/// `POST /create`: uploads the file and opens a session on it.
pub async fn create(
	session: UserSession,
	multipart: Multipart,
) -> Result<Html<String>, WebError> {
	let request = read_create_form(multipart).await?;
	let created = workflow::create_session(&session.api, request).await?;

	Ok(Html(pages::created(&created)))
}

/// `POST /finish`: closes the session and publishes the reviewed file.
pub async fn finish(
	State(ctx): State<AppContext>,
	session: UserSession,
	form: Result<Form<FinishRequest>, FormRejection>,
) -> Result<Html<String>, WebError> {
	let Form(request) =
		form.map_err(|e| Error::from(WorkflowError::InvalidForm(e.body_text())))?;
	let finished =
		workflow::finish_session(&session.api, &request, &ctx.poll, &ctx.shutdown).await?;

	Ok(Html(pages::finished(&finished)))
}

/// `GET /login`: issues a fresh state cookie and renders the sign-in page.
pub async fn login(State(ctx): State<AppContext>, jar: CookieJar) -> (CookieJar, Html<String>) {
	let jar = jar.add(cookies::state_cookie(Broker::new_state(), ctx.secure_cookies));

	(jar, Html(pages::login()))
}

/// `GET /oauth`: redirects to the provider with the state from the cookie.
pub async fn oauth(State(ctx): State<AppContext>, jar: CookieJar) -> Result<Redirect, WebError> {
	let state = jar
		.get(cookies::STATE_COOKIE)
		.map(|cookie| cookie.value().to_owned())
		.ok_or(Error::from(AuthorizationError::MissingState))?;

	Ok(Redirect::to(ctx.broker.authorize_url(&state).as_str()))
}

/// `GET /callback`: validates the state, exchanges the code, and sets the identity cookie.
pub async fn callback(
	State(ctx): State<AppContext>,
	jar: CookieJar,
	Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect), WebError> {
	let expected_state = jar.get(cookies::STATE_COOKIE).map(|cookie| cookie.value().to_owned());
	let record = ctx.broker.complete_login(&params, expected_state.as_deref()).await?;
	let jar = jar
		.add(cookies::user_cookie(&record.user, ctx.secure_cookies))
		.add(cookies::clear_state_cookie());

	tracing::info!(user = %record.user, "logged in");

	Ok((jar, Redirect::to("/")))
}

/// `GET /error`: shows the failure carried in the query.
pub async fn error_page(Query(query): Query<ErrorQuery>) -> Html<String> {
	Html(pages::error(&query.description))
}

/// `GET /style.css`.
pub async fn style() -> impl IntoResponse {
	([(CONTENT_TYPE, "text/css")], pages::STYLE_CSS)
}

async fn read_create_form(mut multipart: Multipart) -> Result<CreateRequest> {
	let mut project = None;
	let mut session_name = None;
	let mut file = None;

	while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
		let name = field.name().unwrap_or_default().to_owned();

		match name.as_str() {
			"project" => project = Some(text(field).await?),
			"session" => session_name = Some(text(field).await?),
			"sessionFile" => {
				let file_name = field.file_name().map(str::to_owned);
				let bytes = field.bytes().await.map_err(invalid_form)?;

				file = Some((file_name, bytes));
			},
			_ => (),
		}
	}

	let project = project
		.filter(|project| !project.is_empty())
		.ok_or(WorkflowError::MissingField { field: "project" })?;
	let project =
		ProjectId::new(&project).map_err(|e| WorkflowError::InvalidForm(e.to_string()))?;
	let session_name = session_name
		.filter(|name| !name.trim().is_empty())
		.ok_or(WorkflowError::MissingField { field: "session" })?;
	let (file_name, bytes) = file
		.and_then(|(file_name, bytes)| {
			file_name.filter(|file_name| !file_name.is_empty()).map(|file_name| (file_name, bytes))
		})
		.ok_or(WorkflowError::MissingField { field: "sessionFile" })?;

	Ok(CreateRequest {
		project,
		session_name,
		file_name,
		file: TransferBody::from_bytes(bytes),
	})
}

async fn text(field: Field<'_>) -> Result<String> {
	Ok(field.text().await.map_err(invalid_form)?.trim().to_owned())
}

fn invalid_form(e: MultipartError) -> WorkflowError {
	WorkflowError::InvalidForm(e.body_text())
}
