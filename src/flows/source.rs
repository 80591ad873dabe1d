//! Refreshing token source bound to one user.
//!
//! A [`TokenSource`] hands out the held token while it is fresh and rotates it otherwise.
//! Rotations run under the broker's per-user guard: after acquiring it, the source re-reads
//! the store so a token another request already rotated is adopted instead of spending the
//! (one-time) refresh secret twice.

// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret, UserId},
	error::ConfigError,
	flows::Broker,
	oauth::OAuthFacade,
	obs::{self, FlowKind},
	store::TokenStore,
};

/// Boxed future returned by [`TokenProvider::access_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenSecret>> + 'a + Send>>;

/// Anything able to produce a bearer token for an API call.
pub trait TokenProvider
where
	Self: Send + Sync,
{
	/// Returns an access token that is valid right now.
	fn access_token(&self) -> TokenFuture<'_>;
}
impl TokenProvider for TokenSecret {
	fn access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { Ok(self.clone()) })
	}
}

/// Token source that persists every token it obtains.
pub struct TokenSource {
	oauth: Arc<dyn OAuthFacade>,
	store: Arc<dyn TokenStore>,
	guard: Arc<AsyncMutex<()>>,
	current: AsyncMutex<TokenRecord>,
}
impl TokenSource {
	/// Creates a source holding `record`.
	pub fn new(broker: &Broker, record: TokenRecord) -> Self {
		Self {
			oauth: broker.oauth.clone(),
			store: broker.store.clone(),
			guard: broker.refresh_guard(&record.user),
			current: AsyncMutex::new(record),
		}
	}

	/// Returns a token valid for at least [`Broker::LEEWAY`], refreshing when needed.
	pub async fn token(&self) -> Result<TokenRecord> {
		let mut current = self.current.lock().await;

		if current.is_fresh_at(OffsetDateTime::now_utc(), Broker::LEEWAY) {
			return Ok(current.clone());
		}

		let rotated = self.rotate(&current, false).await?;

		*current = rotated.clone();

		Ok(rotated)
	}

	/// Rotates the token regardless of its expiry.
	pub async fn refresh(&self) -> Result<TokenRecord> {
		let mut current = self.current.lock().await;
		let rotated = self.rotate(&current, true).await?;

		*current = rotated.clone();

		Ok(rotated)
	}

	async fn rotate(&self, held: &TokenRecord, force: bool) -> Result<TokenRecord> {
		obs::observe(FlowKind::Refresh, "rotate", async move {
			let _singleflight = self.guard.lock().await;
			let latest = match self.store.get(&held.user).await {
				Ok(record) => Some(record),
				Err(e) if e.is_not_found() => None,
				Err(e) => return Err(e.into()),
			};

			if let Some(adopted) = latest.as_ref().filter(|latest| {
				!force
					&& latest.access_token != held.access_token
					&& latest.is_fresh_at(OffsetDateTime::now_utc(), Broker::LEEWAY)
			}) {
				tracing::debug!(user = %held.user, "adopted token rotated by another request");

				return Ok(adopted.clone());
			}

			// The stored record carries the newest refresh secret.
			let basis = latest.as_ref().unwrap_or(held);
			let refresh_token =
				basis.refresh_token.as_ref().ok_or(ConfigError::MissingRefreshToken)?;
			let grant = self.oauth.refresh_token(refresh_token).await?;
			let record = grant.into_record(Some(basis))?;

			self.store.put(&record.user, record.clone()).await?;

			tracing::info!(user = %record.user, "saved refreshed token");

			Ok(record)
		})
		.await
	}
}
impl TokenProvider for TokenSource {
	fn access_token(&self) -> TokenFuture<'_> {
		Box::pin(async move { Ok(self.token().await?.access_token) })
	}
}
impl Debug for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenSource").finish_non_exhaustive()
	}
}

impl Broker {
	/// Loads the stored token for `user` and wraps it in a [`TokenSource`].
	pub async fn token_source(&self, user: &UserId) -> Result<TokenSource> {
		let record = self.store.get(user).await?;

		Ok(TokenSource::new(self, record))
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		oauth::{OAuthFuture, TokenGrant},
		store::MemoryStore,
	};

	#[derive(Default)]
	struct CountingOAuth {
		refreshes: AtomicUsize,
	}
	impl OAuthFacade for CountingOAuth {
		fn authorize_url(&self, state: &str) -> Url {
			Url::parse(&format!("https://auth.example.com/?state={state}"))
				.expect("Authorize URL fixture should parse.")
		}

		fn exchange_code<'a>(&'a self, _code: &'a str) -> OAuthFuture<'a, TokenGrant> {
			Box::pin(async move { Err(Error::InvalidGrant { reason: "unused".into() }) })
		}

		fn refresh_token<'a>(
			&'a self,
			refresh_token: &'a TokenSecret,
		) -> OAuthFuture<'a, TokenGrant> {
			let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
			let used = refresh_token.expose().to_owned();

			Box::pin(async move {
				Ok(TokenGrant {
					access_token: TokenSecret::new(format!("access-{n}")),
					refresh_token: Some(TokenSecret::new(format!("{used}+"))),
					issued_at: OffsetDateTime::now_utc(),
					expires_in: Duration::hours(1),
					user_name: None,
					claims: BTreeMap::new(),
				})
			})
		}
	}

	fn record(access: &str, expires_in: Duration) -> TokenRecord {
		TokenRecord::builder(UserId::new("jane@example.com").expect("User should be valid."))
			.access_token(access)
			.refresh_token("refresh-0")
			.expires_in(expires_in)
			.build()
			.expect("Token record fixture should build.")
	}

	fn broker(oauth: Arc<CountingOAuth>, store: Arc<MemoryStore>) -> Broker {
		Broker::new(oauth, store)
	}

	#[tokio::test]
	async fn concurrent_sources_share_one_rotation() {
		let oauth = Arc::new(CountingOAuth::default());
		let store = Arc::new(MemoryStore::default());
		let broker = broker(oauth.clone(), store.clone());
		let stale = record("access-0", Duration::seconds(5));

		store.put(&stale.user, stale.clone()).await.expect("Seeding the store should succeed.");

		let first = TokenSource::new(&broker, stale.clone());
		let second = TokenSource::new(&broker, stale);
		let (a, b) = tokio::join!(first.token(), second.token());
		let (a, b) = (a.expect("First source should refresh."), b.expect("Second should adopt."));

		assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 1);
		assert_eq!(a.access_token, b.access_token);
		assert_eq!(a.refresh_token.as_ref().map(TokenSecret::expose), Some("refresh-0+"));
	}

	#[tokio::test]
	async fn forced_refresh_rotates_fresh_tokens() {
		let oauth = Arc::new(CountingOAuth::default());
		let store = Arc::new(MemoryStore::default());
		let broker = broker(oauth.clone(), store.clone());
		let fresh = record("access-0", Duration::hours(1));

		store.put(&fresh.user, fresh.clone()).await.expect("Seeding the store should succeed.");

		let source = TokenSource::new(&broker, fresh);

		assert_eq!(
			source.token().await.expect("Fresh token should be served.").access_token.expose(),
			"access-0"
		);
		assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 0);

		let rotated = source.refresh().await.expect("Forced refresh should succeed.");

		assert_eq!(rotated.access_token.expose(), "access-1");
		assert_eq!(
			store.get(&rotated.user).await.expect("Rotated token should be stored.").access_token,
			rotated.access_token
		);
	}

	#[tokio::test]
	async fn missing_refresh_secret_is_reported() {
		let oauth = Arc::new(CountingOAuth::default());
		let store = Arc::new(MemoryStore::default());
		let broker = broker(oauth.clone(), store);
		let mut expired = record("access-0", Duration::seconds(1));

		expired.refresh_token = None;

		let err = TokenSource::new(&broker, expired)
			.token()
			.await
			.expect_err("Refresh without a secret must fail.");

		assert!(matches!(err, Error::Config(ConfigError::MissingRefreshToken)));
		assert_eq!(oauth.refreshes.load(Ordering::SeqCst), 0);
	}
}
