//! Persisted token records, validity checks, and builders.

// self
use crate::{
	_prelude::*,
	auth::{UserId, token::secret::TokenSecret},
};

/// Lifecycle status of a token record at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Usable without a refresh.
	Active,
	/// Inside the skew leeway before expiry; treated as unusable.
	Expiring,
	/// Past its expiry instant.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
}

/// OAuth token issued for one user, as stored in the token store.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Identity the record is keyed by.
	pub user: UserId,
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret. One-time use: only the latest value is valid.
	pub refresh_token: Option<TokenSecret>,
	/// Issued-at instant recorded when the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// Expiry instant derived from `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
	/// Extra claims returned next to the token (including `userName`).
	#[serde(default)]
	pub claims: BTreeMap<String, serde_json::Value>,
}
impl TokenRecord {
	/// Returns a builder for the provided identity.
	pub fn builder(user: UserId) -> TokenRecordBuilder {
		TokenRecordBuilder::new(user)
	}

	/// Computes the status at `instant`, treating the last `leeway` before expiry as unusable.
	pub fn status_at(&self, instant: OffsetDateTime, leeway: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			TokenStatus::Expired
		} else if instant + leeway >= self.expires_at {
			TokenStatus::Expiring
		} else {
			TokenStatus::Active
		}
	}

	/// Returns `true` if the record can be used at `instant` without a refresh.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, leeway: Duration) -> bool {
		matches!(self.status_at(instant, leeway), TokenStatus::Active)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("user", &self.user)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.field("claims", &self.claims.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug)]
pub struct TokenRecordBuilder {
	user: UserId,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	claims: BTreeMap<String, serde_json::Value>,
}
impl TokenRecordBuilder {
	fn new(user: UserId) -> Self {
		Self {
			user,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
			claims: BTreeMap::new(),
		}
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Replaces the extra claims.
	pub fn claims(mut self, claims: BTreeMap<String, serde_json::Value>) -> Self {
		self.claims = claims;

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(TokenRecordBuilderError::MissingExpiry),
		};

		Ok(TokenRecord {
			user: self.user,
			access_token,
			refresh_token: self.refresh_token,
			issued_at,
			expires_at,
			claims: self.claims,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn user() -> UserId {
		UserId::new("jane@example.com").expect("User fixture should be valid.")
	}

	#[test]
	fn status_honours_leeway_before_expiry() {
		let record = TokenRecord::builder(user())
			.access_token("access")
			.refresh_token("refresh")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed.");
		let leeway = Duration::seconds(10);

		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:30 UTC), leeway),
			TokenStatus::Active
		);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:59:55 UTC), leeway),
			TokenStatus::Expiring
		);
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 01:00 UTC), leeway),
			TokenStatus::Expired
		);
		assert!(!record.is_fresh_at(macros::datetime!(2025-01-01 00:59:55 UTC), leeway));
	}

	#[test]
	fn builder_requires_access_token_and_expiry() {
		assert_eq!(
			TokenRecord::builder(user()).expires_in(Duration::hours(1)).build().err(),
			Some(TokenRecordBuilderError::MissingAccessToken)
		);
		assert_eq!(
			TokenRecord::builder(user()).access_token("a").build().err(),
			Some(TokenRecordBuilderError::MissingExpiry)
		);

		let record = TokenRecord::builder(user())
			.access_token("a")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Relative expiry should be supported.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let record = TokenRecord::builder(user())
			.access_token("super-secret-access")
			.refresh_token("super-secret-refresh")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token record builder should succeed.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("super-secret"));
		assert!(rendered.contains("jane@example.com"));
	}
}
