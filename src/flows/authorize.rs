//! Login: CSRF state generation, authorize URL, and the persisted code exchange.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::TokenRecord,
	error::AuthorizationError,
	flows::Broker,
	obs::{self, FlowKind},
};

const STATE_LEN: usize = 32;

/// Query parameters the authorization server sends back to the callback.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
	/// Authorization code.
	pub code: Option<String>,
	/// Echoed CSRF state.
	pub state: Option<String>,
	/// Provider error code, when the user or provider aborted the login.
	pub error: Option<String>,
}

impl Broker {
	/// Generates a fresh CSRF state value (32 alphanumeric characters).
	pub fn new_state() -> String {
		rand::rng().sample_iter(Alphanumeric).take(STATE_LEN).map(char::from).collect()
	}

	/// Builds the provider authorization URL for a state previously issued to the browser.
	pub fn authorize_url(&self, state: &str) -> Url {
		self.oauth.authorize_url(state)
	}

	/// Validates the callback and exchanges the code, persisting the token before returning it.
	///
	/// Checks run in order: provider error, missing state cookie, state mismatch, missing code.
	/// No exchange happens unless all of them pass.
	pub async fn complete_login(
		&self,
		params: &CallbackParams,
		expected_state: Option<&str>,
	) -> Result<TokenRecord> {
		if let Some(error) = params.error.as_deref().filter(|error| !error.is_empty()) {
			return Err(AuthorizationError::Provider(error.to_owned()).into());
		}

		let expected_state = expected_state.ok_or(AuthorizationError::MissingState)?;

		if params.state.as_deref() != Some(expected_state) {
			return Err(AuthorizationError::StateMismatch.into());
		}

		let code = params
			.code
			.as_deref()
			.filter(|code| !code.is_empty())
			.ok_or(AuthorizationError::MissingCode)?;

		self.exchange_code(code).await
	}

	/// Exchanges an authorization code and persists the resulting token.
	pub async fn exchange_code(&self, code: &str) -> Result<TokenRecord> {
		obs::observe(FlowKind::Login, "exchange_code", async move {
			let grant = self.oauth.exchange_code(code).await?;
			let record = grant.into_record(None)?;

			self.store.put(&record.user, record.clone()).await?;

			tracing::info!(user = %record.user, "saved token");

			Ok(record)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn state_is_32_alphanumeric_chars() {
		let state = Broker::new_state();

		assert_eq!(state.len(), STATE_LEN);
		assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(state, Broker::new_state());
	}
}
