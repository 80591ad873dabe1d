//! OAuth client facade for the Studio authorization server.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
	EndpointSet, ExtraTokenFields, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	Scope, StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicErrorResponseType, BasicRequestTokenError,
		BasicRevocationErrorResponse, BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret, UserId},
	config::Config,
	error::{AuthorizationError, ConfigError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

/// Scopes requested at login.
pub const SCOPES: [&str; 2] = ["full_user", "jobs"];
/// Token response claim carrying the user identity.
pub const USER_CLAIM: &str = "userName";

type StudioTokenResponse = StandardTokenResponse<StudioTokenFields, BasicTokenType>;
type ConfiguredClient = oauth2::Client<
	BasicErrorResponse,
	StudioTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Boxed future returned by [`OAuthFacade`] operations.
pub type OAuthFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Extra fields the Studio token endpoint returns next to the standard ones.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StudioTokenFields {
	/// Identity of the user the token was issued to.
	#[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
	pub user_name: Option<String>,
	/// Every other non-standard field.
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}
impl ExtraTokenFields for StudioTokenFields {}

/// Token issued by the authorization server, before it is bound to a user record.
#[derive(Clone)]
pub struct TokenGrant {
	/// Access secret.
	pub access_token: TokenSecret,
	/// Rotated refresh secret, when the server issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the response was received.
	pub issued_at: OffsetDateTime,
	/// Lifetime relative to `issued_at`.
	pub expires_in: Duration,
	/// Value of the `userName` claim.
	pub user_name: Option<String>,
	/// Remaining non-standard fields.
	pub claims: BTreeMap<String, serde_json::Value>,
}
impl TokenGrant {
	/// Binds the grant to a user and produces the record to persist.
	///
	/// The identity comes from the `userName` claim and falls back to `previous` (the record
	/// being refreshed). A grant without a new refresh secret keeps the previous one.
	pub fn into_record(self, previous: Option<&TokenRecord>) -> Result<TokenRecord> {
		let user = match (self.user_name.as_deref(), previous) {
			(Some(name), _) => UserId::new(name).map_err(AuthorizationError::from)?,
			(None, Some(previous)) => previous.user.clone(),
			(None, None) =>
				return Err(AuthorizationError::MissingIdentity { claim: USER_CLAIM }.into()),
		};
		let refresh_token = self
			.refresh_token
			.or_else(|| previous.and_then(|previous| previous.refresh_token.clone()));
		let mut claims = self.claims;

		claims.insert(USER_CLAIM.into(), serde_json::Value::String(user.to_string()));

		Ok(TokenRecord {
			user,
			access_token: self.access_token,
			refresh_token,
			issued_at: self.issued_at,
			expires_at: self.issued_at + self.expires_in,
			claims,
		})
	}
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &self.access_token)
			.field("refresh_token", &self.refresh_token)
			.field("issued_at", &self.issued_at)
			.field("expires_in", &self.expires_in)
			.field("user_name", &self.user_name)
			.finish()
	}
}

/// Exchange capability used by the token flows.
pub trait OAuthFacade
where
	Self: Send + Sync,
{
	/// Builds the provider authorization URL carrying `state`.
	fn authorize_url(&self, state: &str) -> Url;

	/// Exchanges an authorization code for a token.
	fn exchange_code<'a>(&'a self, code: &'a str) -> OAuthFuture<'a, TokenGrant>;

	/// Exchanges a refresh secret for a new token.
	fn refresh_token<'a>(&'a self, refresh_token: &'a TokenSecret) -> OAuthFuture<'a, TokenGrant>;
}

/// [`OAuthFacade`] backed by the `oauth2` crate.
pub struct StudioOAuth {
	oauth_client: ConfiguredClient,
	http_client: TokenHttpClient,
}
impl StudioOAuth {
	/// Builds the facade from the configured endpoints and credentials.
	pub fn from_config(config: &Config, http_client: TokenHttpClient) -> Result<Self> {
		let auth_url = AuthUrl::from_url(config.authorize_url.clone());
		let token_url = TokenUrl::from_url(config.token_url.clone());
		let redirect_url = RedirectUrl::from_url(config.callback_url()?);
		let oauth_client = oauth2::Client::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.clone()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client })
	}
}
impl OAuthFacade for StudioOAuth {
	fn authorize_url(&self, state: &str) -> Url {
		let state = state.to_owned();
		let (url, _) = self
			.oauth_client
			.authorize_url(move || CsrfToken::new(state))
			.add_scopes(SCOPES.iter().map(|scope| Scope::new((*scope).to_owned())))
			.add_extra_param("access_type", "online")
			.url();

		url
	}

	fn exchange_code<'a>(&'a self, code: &'a str) -> OAuthFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.instrumented(meta.clone());
			let response = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;

			map_token_response(response)
		})
	}

	fn refresh_token<'a>(&'a self, refresh_token: &'a TokenSecret) -> OAuthFuture<'a, TokenGrant> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.instrumented(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(meta.take(), err))?;

			map_token_response(response)
		})
	}
}

fn map_token_response(response: StudioTokenResponse) -> Result<TokenGrant> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let fields = response.extra_fields().clone();

	Ok(TokenGrant {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_token: response.refresh_token().map(|token| TokenSecret::new(token.secret())),
		issued_at: OffsetDateTime::now_utc(),
		expires_in: Duration::seconds(expires_in),
		user_name: fields.user_name,
		claims: fields.extra,
	})
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(&response, status),
		RequestTokenError::Request(error) => map_transport_error(error, status),
		RequestTokenError::Parse(source, _body) =>
			TransientError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) => TransientError::TokenEndpoint {
			message: format!("Token endpoint returned an unexpected response: {message}"),
			status,
		}
		.into(),
	}
}

fn map_server_response_error(response: &BasicErrorResponse, status: Option<u16>) -> Error {
	let message = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	match response.error() {
		BasicErrorResponseType::InvalidGrant => Error::InvalidGrant { reason: message },
		BasicErrorResponseType::Extension(code) if code == "access_denied" =>
			Error::InvalidGrant { reason: message },
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			Error::InvalidClient { reason: message },
		_ => TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>, status: Option<u16>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => {
			let inner = *inner;

			if inner.is_builder() {
				return ConfigError::from(inner).into();
			}
			if inner.is_timeout() {
				return TransientError::TokenEndpoint {
					message: "Request timed out while calling the token endpoint".into(),
					status,
				}
				.into();
			}

			TransportError::network("the token endpoint", inner).into()
		},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message: format!("HTTP client error while calling the token endpoint: {message}"),
			status,
		}
		.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client error while calling the token endpoint".into(),
			status,
		}
		.into(),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::StandardErrorResponse;
	// self
	use super::*;

	fn grant(user_name: Option<&str>, refresh: Option<&str>) -> TokenGrant {
		TokenGrant {
			access_token: TokenSecret::new("access"),
			refresh_token: refresh.map(TokenSecret::new),
			issued_at: OffsetDateTime::UNIX_EPOCH,
			expires_in: Duration::hours(1),
			user_name: user_name.map(str::to_owned),
			claims: BTreeMap::new(),
		}
	}

	fn previous() -> TokenRecord {
		TokenRecord::builder(UserId::new("jane@example.com").expect("User should be valid."))
			.access_token("old-access")
			.refresh_token("old-refresh")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Previous record should build.")
	}

	#[test]
	fn authorize_url_carries_scopes_state_and_access_type() {
		let config = Config::new(
			"client-id",
			"client-secret",
			Url::parse("http://localhost:5000").expect("App URL should parse."),
		)
		.expect("Default configuration should build.");
		let facade = StudioOAuth::from_config(
			&config,
			TokenHttpClient::with_client(ReqwestClient::new()),
		)
		.expect("Facade should build from defaults.");
		let url = facade.authorize_url("abc123");
		let pairs = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(url.host_str(), Some("authserver.bluebeam.com"));
		assert_eq!(pairs.get("state").map(String::as_str), Some("abc123"));
		assert_eq!(pairs.get("scope").map(String::as_str), Some("full_user jobs"));
		assert_eq!(pairs.get("access_type").map(String::as_str), Some("online"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("http://localhost:5000/callback")
		);
	}

	#[test]
	fn grant_identity_prefers_claim_then_previous_record() {
		let record = grant(Some("john@example.com"), Some("r1"))
			.into_record(None)
			.expect("Claimed identity should be accepted.");

		assert_eq!(record.user.as_ref(), "john@example.com");
		assert_eq!(record.expires_at, OffsetDateTime::UNIX_EPOCH + Duration::hours(1));

		let previous = previous();
		let record = grant(None, None)
			.into_record(Some(&previous))
			.expect("Refresh without a claim should fall back to the previous identity.");

		assert_eq!(record.user, previous.user);
		assert_eq!(
			record.refresh_token.as_ref().map(TokenSecret::expose),
			Some("old-refresh"),
			"A missing refresh secret keeps the previous one."
		);

		let err = grant(None, Some("r1"))
			.into_record(None)
			.expect_err("A grant without any identity must be rejected.");

		assert!(matches!(
			err,
			Error::Authorization(AuthorizationError::MissingIdentity { claim: USER_CLAIM })
		));
	}

	#[test]
	fn server_errors_are_classified() {
		let invalid_grant =
			StandardErrorResponse::new(BasicErrorResponseType::InvalidGrant, None, None);
		let denied = StandardErrorResponse::new(
			BasicErrorResponseType::Extension("access_denied".into()),
			None,
			None,
		);
		let invalid_client =
			StandardErrorResponse::new(BasicErrorResponseType::UnauthorizedClient, None, None);
		let other = StandardErrorResponse::new(
			BasicErrorResponseType::InvalidRequest,
			Some("bad".into()),
			None,
		);

		assert!(matches!(
			map_server_response_error(&invalid_grant, Some(400)),
			Error::InvalidGrant { .. }
		));
		assert!(matches!(
			map_server_response_error(&denied, Some(400)),
			Error::InvalidGrant { .. }
		));
		assert!(matches!(
			map_server_response_error(&invalid_client, Some(401)),
			Error::InvalidClient { .. }
		));
		assert!(matches!(
			map_server_response_error(&other, Some(400)),
			Error::Transient(TransientError::TokenEndpoint { status: Some(400), .. })
		));
	}
}
