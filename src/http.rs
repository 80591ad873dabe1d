//! Transport primitives shared by the token exchange and the Studio client.
//!
//! Three clients exist at runtime, all plain [`ReqwestClient`]s with different deadlines:
//!
//! - the token client, wrapped in [`TokenHttpClient`] so `oauth2` can drive it while
//!   [`ResponseMetadataSlot`] captures the HTTP status for error classification;
//! - the API client, used with a bearer token for every Studio call;
//! - the transfer client, used without credentials for pre-signed upload and download URLs.
//!
//! Token and API requests must not follow redirects: the token endpoint answers directly, and a
//! redirect on an API call would leak the bearer header to another origin.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse};
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Metadata from the most recent token endpoint response.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the token endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between the transport and error mapping.
///
/// A fresh slot is created for each token request and read right after `oauth2` resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Reqwest client used for token endpoint calls.
#[derive(Clone, Debug)]
pub struct TokenHttpClient(ReqwestClient);
impl TokenHttpClient {
	/// Builds a client that never follows redirects and gives up after `timeout`.
	pub fn new(timeout: StdDuration) -> Result<Self, ConfigError> {
		Ok(Self(api_client(timeout)?))
	}

	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds an [`AsyncHttpClient`] handle that records the response status in `slot`.
	pub(crate) fn instrumented(&self, slot: ResponseMetadataSlot) -> InstrumentedHandle {
		InstrumentedHandle(Arc::new(InstrumentedHttpClient { client: self.0.clone(), slot }))
	}
}

struct InstrumentedHttpClient {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}

/// [`AsyncHttpClient`] adapter for reqwest that reports response metadata.
#[derive(Clone)]
pub struct InstrumentedHandle(Arc<InstrumentedHttpClient>);
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = Arc::clone(&self.0);

		Box::pin(async move {
			client.slot.take();

			let response = client
				.client
				.execute(request.try_into().map_err(Box::new)?)
				.await
				.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			client.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Builds the client used for authenticated JSON calls.
pub fn api_client(timeout: StdDuration) -> Result<ReqwestClient, ConfigError> {
	ReqwestClient::builder()
		.redirect(Policy::none())
		.timeout(timeout)
		.build()
		.map_err(ConfigError::from)
}

/// Builds the client used for pre-signed transfers.
///
/// Transfers carry whole documents, so they get their own, longer deadline.
pub fn transfer_client(timeout: StdDuration) -> Result<ReqwestClient, ConfigError> {
	ReqwestClient::builder().timeout(timeout).build().map_err(ConfigError::from)
}
