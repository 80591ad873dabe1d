// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use roundtripper::{
	auth::{TokenRecord, UserId},
	config::Config,
	error::{AuthorizationError, Error},
	flows::{Broker, CallbackParams},
	http::TokenHttpClient,
	oauth::StudioOAuth,
	store::{MemoryStore, TokenStore},
	url::Url,
};

const USER: &str = "reviewer@example.com";

fn broker(server: &MockServer) -> (Broker, Arc<MemoryStore>) {
	let mut config = Config::new(
		"client-id",
		"client-secret",
		Url::parse("http://localhost:5000").expect("App URL should parse."),
	)
	.expect("Default configuration should build.");

	config.token_url = Url::parse(&server.url("/auth/token")).expect("Token URL should parse.");

	let http_client =
		TokenHttpClient::new(StdDuration::from_secs(5)).expect("Token HTTP client should build.");
	let oauth = StudioOAuth::from_config(&config, http_client).expect("OAuth client should build.");
	let store = Arc::new(MemoryStore::default());

	(Broker::new(Arc::new(oauth), store.clone()), store)
}

fn user() -> UserId {
	UserId::new(USER).expect("User fixture should be valid.")
}

fn record(access: &str, refresh: &str, expires_in: Duration) -> TokenRecord {
	TokenRecord::builder(user())
		.access_token(access)
		.refresh_token(refresh)
		.expires_in(expires_in)
		.build()
		.expect("Token record fixture should build.")
}

#[tokio::test]
async fn code_exchange_persists_the_token_under_the_user_claim() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/auth/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200).json_body(json!({
				"access_token": "access-1",
				"refresh_token": "refresh-1",
				"token_type": "bearer",
				"expires_in": 3600,
				"userName": USER,
				"client_id": "client-id",
			}));
		})
		.await;
	let (broker, store) = broker(&server);
	let params = CallbackParams {
		code: Some("code-1".into()),
		state: Some("nonce".into()),
		error: None,
	};
	let record =
		broker.complete_login(&params, Some("nonce")).await.expect("Login should complete.");

	mock.assert_async().await;

	assert_eq!(record.user, user());
	assert_eq!(record.access_token.expose(), "access-1");
	assert_eq!(record.claims.get("userName"), Some(&json!(USER)));
	assert_eq!(record.claims.get("client_id"), Some(&json!("client-id")));

	let stored = store.get(&user()).await.expect("Token should be stored.");

	assert_eq!(stored.access_token.expose(), "access-1");
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-1"));
}

#[tokio::test]
async fn user_names_with_spaces_can_log_in() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200).json_body(json!({
				"access_token": "access-1",
				"refresh_token": "refresh-1",
				"token_type": "bearer",
				"expires_in": 3600,
				"userName": "Jane Doe",
			}));
		})
		.await;
	let (broker, store) = broker(&server);
	let params = CallbackParams {
		code: Some("code-1".into()),
		state: Some("nonce".into()),
		error: None,
	};
	let record =
		broker.complete_login(&params, Some("nonce")).await.expect("Login should complete.");
	let jane = UserId::new("Jane Doe").expect("User name with a space should be valid.");

	mock.assert_async().await;

	assert_eq!(record.user, jane);
	assert!(store.get(&jane).await.is_ok());
}

#[tokio::test]
async fn state_mismatch_never_reaches_the_token_endpoint() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(500);
		})
		.await;
	let (broker, store) = broker(&server);
	let params = CallbackParams {
		code: Some("code-1".into()),
		state: Some("forged".into()),
		error: None,
	};
	let err = broker
		.complete_login(&params, Some("nonce"))
		.await
		.expect_err("A mismatched state should fail.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::StateMismatch)));
	assert_eq!(err.to_string(), "Authorization Error");

	let err = broker
		.complete_login(&params, None)
		.await
		.expect_err("A missing state cookie should fail.");

	assert!(matches!(err, Error::Authorization(AuthorizationError::MissingState)));
	assert_eq!(mock.hits_async().await, 0);
	assert!(store.is_empty());
}

#[tokio::test]
async fn provider_errors_are_reported_before_anything_else() {
	let server = MockServer::start_async().await;
	let (broker, _) = broker(&server);
	let params = CallbackParams { code: None, state: None, error: Some("access_denied".into()) };
	let err = broker
		.complete_login(&params, Some("nonce"))
		.await
		.expect_err("A provider error should fail.");

	assert_eq!(err.to_string(), "access_denied");
}

#[tokio::test]
async fn fresh_tokens_are_served_from_cache() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(500);
		})
		.await;
	let (broker, store) = broker(&server);

	store
		.put(&user(), record("access-0", "refresh-0", Duration::hours(1)))
		.await
		.expect("Seeding the store should succeed.");

	let source = broker.token_source(&user()).await.expect("Token source should load.");

	for _ in 0..3 {
		let token = source.token().await.expect("Fresh token should be served.");

		assert_eq!(token.access_token.expose(), "access-0");
	}

	assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn expired_tokens_refresh_once_and_persist() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(200).json_body(json!({
				"access_token": "access-1",
				"refresh_token": "refresh-1",
				"token_type": "bearer",
				"expires_in": 3600,
			}));
		})
		.await;
	let (broker, store) = broker(&server);

	store
		.put(&user(), record("access-0", "refresh-0", Duration::seconds(1)))
		.await
		.expect("Seeding the store should succeed.");

	let source = broker.token_source(&user()).await.expect("Token source should load.");
	let first = source.token().await.expect("Refresh should succeed.");
	let second = source.token().await.expect("Refreshed token should be cached.");

	assert_eq!(mock.hits_async().await, 1);
	assert_eq!(first.access_token.expose(), "access-1");
	assert_eq!(second.access_token.expose(), "access-1");
	assert_eq!(first.user, user());

	let stored = store.get(&user()).await.expect("Refreshed token should be stored.");

	assert_eq!(stored.access_token.expose(), "access-1");
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-1"));
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn revoked_refresh_tokens_surface_invalid_grant() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/token");
			then.status(400).json_body(json!({
				"error": "invalid_grant",
				"error_description": "refresh token revoked",
			}));
		})
		.await;

	let (broker, store) = broker(&server);

	store
		.put(&user(), record("access-0", "refresh-0", Duration::seconds(1)))
		.await
		.expect("Seeding the store should succeed.");

	let source = broker.token_source(&user()).await.expect("Token source should load.");
	let err = source.token().await.expect_err("A revoked refresh token should fail.");

	assert!(matches!(err, Error::InvalidGrant { .. }));

	let stored = store.get(&user()).await.expect("The old record should remain.");

	assert_eq!(stored.access_token.expose(), "access-0");
}

#[tokio::test]
async fn unknown_users_have_no_token_source() {
	let server = MockServer::start_async().await;
	let (broker, _) = broker(&server);
	let err = broker.token_source(&user()).await.expect_err("Unknown users should fail.");

	match err {
		Error::Storage(e) => assert!(e.is_not_found()),
		other => panic!("Unexpected error: {other:?}"),
	}
}
