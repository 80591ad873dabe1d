//! Runtime configuration: `config.json` with an environment fallback.
//!
//! When the file exists it is the only source. When it does not, `CLIENT_ID`, `CLIENT_SECRET`,
//! and `URL` are read from the environment and every other key takes its default.

// std
use std::{
	env, fs,
	io::ErrorKind,
	net::{Ipv4Addr, SocketAddr},
	path::{Path, PathBuf},
};
// self
use crate::{_prelude::*, error::ConfigError, workflow::PollPolicy};

/// Default location of the config file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
/// Default token store location.
pub const DEFAULT_STORE_PATH: &str = "tokens.json";
/// Default Studio API base.
pub const DEFAULT_API_BASE: &str = "https://studioapi.bluebeam.com/publicapi/v1/";
/// Default authorization endpoint.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://authserver.bluebeam.com/auth/oauth/authorize";
/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://authserver.bluebeam.com/auth/token";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 600;

/// Fully resolved configuration.
#[derive(Clone)]
pub struct Config {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: String,
	/// Public base URL of this service; the OAuth callback is `<url>/callback`.
	pub url: Url,
	/// Socket the HTTP server binds.
	pub listen: SocketAddr,
	/// Token store file.
	pub store_path: PathBuf,
	/// Studio API base.
	pub api_base: Url,
	/// Authorization endpoint.
	pub authorize_url: Url,
	/// Token endpoint.
	pub token_url: Url,
	/// Deadline of each token or API call.
	pub request_timeout: StdDuration,
	/// Deadline of each pre-signed upload or download.
	pub transfer_timeout: StdDuration,
	/// Snapshot polling bounds.
	pub poll: PollPolicy,
}
impl Config {
	/// Builds a configuration with every optional key at its default.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		url: Url,
	) -> Result<Self, ConfigError> {
		Ok(Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			url,
			listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
			store_path: PathBuf::from(DEFAULT_STORE_PATH),
			api_base: parse_url("apiBase", DEFAULT_API_BASE)?,
			authorize_url: parse_url("authorizeUrl", DEFAULT_AUTHORIZE_URL)?,
			token_url: parse_url("tokenUrl", DEFAULT_TOKEN_URL)?,
			request_timeout: StdDuration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
			transfer_timeout: StdDuration::from_secs(DEFAULT_TRANSFER_TIMEOUT_SECS),
			poll: PollPolicy::default(),
		})
	}

	/// Loads `path`, falling back to the process environment when the file is absent.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		Self::load_with(path, |key| env::var(key).ok())
	}

	/// Loads `path`, falling back to `lookup` when the file is absent.
	pub fn load_with<F>(path: impl AsRef<Path>, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let path = path.as_ref();
		let file = match fs::read(path) {
			Ok(bytes) => ConfigFile::parse(path, &bytes)?,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				tracing::info!(path = %path.display(), "config file not found, using environment");

				ConfigFile::from_env(lookup)
			},
			Err(source) =>
				return Err(ConfigError::ReadFile { path: path.display().to_string(), source }),
		};

		file.resolve()
	}

	/// OAuth redirect URL, `<url>/callback`.
	pub fn callback_url(&self) -> Result<Url, ConfigError> {
		let mut url = self.url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::CannotBeABase { url: self.url.to_string() })?
			.pop_if_empty()
			.push("callback");

		Ok(url)
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("url", &self.url.as_str())
			.field("listen", &self.listen)
			.field("store_path", &self.store_path)
			.field("api_base", &self.api_base.as_str())
			.field("authorize_url", &self.authorize_url.as_str())
			.field("token_url", &self.token_url.as_str())
			.field("request_timeout", &self.request_timeout)
			.field("transfer_timeout", &self.transfer_timeout)
			.field("poll", &self.poll)
			.finish()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
	client_id: Option<String>,
	client_secret: Option<String>,
	url: Option<String>,
	listen: Option<SocketAddr>,
	store_path: Option<PathBuf>,
	api_base: Option<String>,
	authorize_url: Option<String>,
	token_url: Option<String>,
	request_timeout_secs: Option<u64>,
	transfer_timeout_secs: Option<u64>,
	poll_interval_secs: Option<u64>,
	poll_max_attempts: Option<u32>,
	poll_max_secs: Option<u64>,
}
impl ConfigFile {
	fn parse(path: &Path, bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::ParseFile { path: path.display().to_string(), source })
	}

	fn from_env<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		Self {
			client_id: lookup("CLIENT_ID"),
			client_secret: lookup("CLIENT_SECRET"),
			url: lookup("URL"),
			..Default::default()
		}
	}

	fn resolve(self) -> Result<Config, ConfigError> {
		let client_id = required(self.client_id, "clientId")?;
		let client_secret = required(self.client_secret, "clientSecret")?;
		let url = parse_url("url", &required(self.url, "url")?)?;
		let mut config = Config::new(client_id, client_secret, url)?;

		if let Some(listen) = self.listen {
			config.listen = listen;
		}
		if let Some(store_path) = self.store_path {
			config.store_path = store_path;
		}
		if let Some(api_base) = self.api_base {
			config.api_base = parse_url("apiBase", &api_base)?;
		}
		if let Some(authorize_url) = self.authorize_url {
			config.authorize_url = parse_url("authorizeUrl", &authorize_url)?;
		}
		if let Some(token_url) = self.token_url {
			config.token_url = parse_url("tokenUrl", &token_url)?;
		}
		if let Some(secs) = self.request_timeout_secs {
			config.request_timeout = StdDuration::from_secs(secs);
		}
		if let Some(secs) = self.transfer_timeout_secs {
			config.transfer_timeout = StdDuration::from_secs(secs);
		}
		if let Some(secs) = self.poll_interval_secs {
			if secs == 0 {
				return Err(ConfigError::ZeroSetting { key: "pollIntervalSecs" });
			}

			config.poll.interval = StdDuration::from_secs(secs);
		}
		if let Some(attempts) = self.poll_max_attempts {
			config.poll.max_attempts = Some(attempts);
		}
		if let Some(secs) = self.poll_max_secs {
			// Zero lifts the time bound.
			config.poll.max_duration = (secs > 0).then(|| StdDuration::from_secs(secs));
		}

		Ok(config)
	}
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
	value.filter(|value| !value.trim().is_empty()).ok_or(ConfigError::MissingSetting { key })
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })
}

#[cfg(test)]
mod tests {
	// std
	use std::process;
	// self
	use super::*;

	fn temp_path(tag: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"roundtripper_config_{tag}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	#[test]
	fn file_values_override_defaults() {
		let path = temp_path("file");

		fs::write(
			&path,
			r#"{
				"clientId": "id",
				"clientSecret": "secret",
				"url": "https://roundtripper.example.com",
				"listen": "127.0.0.1:8080",
				"pollIntervalSecs": 1,
				"pollMaxAttempts": 3,
				"pollMaxSecs": 0
			}"#,
		)
		.expect("Failed to write config fixture.");

		let config = Config::load_with(&path, |_| None).expect("Config file should load.");

		assert_eq!(config.client_id, "id");
		assert_eq!(config.listen, "127.0.0.1:8080".parse().expect("Socket fixture should parse."));
		assert_eq!(config.poll.interval, StdDuration::from_secs(1));
		assert_eq!(config.poll.max_attempts, Some(3));
		assert_eq!(config.poll.max_duration, None);
		assert_eq!(config.api_base.as_str(), DEFAULT_API_BASE);
		assert_eq!(
			config.callback_url().expect("Callback URL should build.").as_str(),
			"https://roundtripper.example.com/callback"
		);

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn environment_is_used_when_the_file_is_absent() {
		let path = temp_path("absent");
		let config = Config::load_with(&path, |key| match key {
			"CLIENT_ID" => Some("env-id".into()),
			"CLIENT_SECRET" => Some("env-secret".into()),
			"URL" => Some("http://localhost:5000".into()),
			_ => None,
		})
		.expect("Environment fallback should load.");

		assert_eq!(config.client_id, "env-id");
		assert_eq!(config.listen.port(), DEFAULT_PORT);
		assert_eq!(config.store_path, PathBuf::from(DEFAULT_STORE_PATH));
		assert_eq!(config.poll, PollPolicy::default());
		assert!(!format!("{config:?}").contains("env-secret"));
	}

	#[test]
	fn missing_and_invalid_settings_are_reported() {
		let path = temp_path("missing");
		let err = Config::load_with(&path, |key| (key == "CLIENT_ID").then(|| "id".into()))
			.expect_err("Missing secret must fail.");

		assert!(matches!(err, ConfigError::MissingSetting { key: "clientSecret" }));

		let err = Config::load_with(&path, |key| match key {
			"URL" => Some("not a url".into()),
			_ => Some("value".into()),
		})
		.expect_err("Invalid URL must fail.");

		assert!(matches!(err, ConfigError::InvalidUrl { name: "url", .. }));
	}

	#[test]
	fn zero_poll_interval_is_rejected() {
		let path = temp_path("zero_interval");

		fs::write(
			&path,
			r#"{
				"clientId": "id",
				"clientSecret": "secret",
				"url": "https://roundtripper.example.com",
				"pollIntervalSecs": 0
			}"#,
		)
		.expect("Failed to write config fixture.");

		let err = Config::load_with(&path, |_| None).expect_err("A zero interval must fail.");

		assert!(matches!(err, ConfigError::ZeroSetting { key: "pollIntervalSecs" }));

		let _ = fs::remove_file(&path);
	}

	#[test]
	fn malformed_files_report_the_json_path() {
		let path = temp_path("malformed");

		fs::write(&path, r#"{ "clientId": "id", "pollMaxAttempts": "three" }"#)
			.expect("Failed to write config fixture.");

		let err = Config::load_with(&path, |_| None).expect_err("Malformed file must fail.");

		match err {
			ConfigError::ParseFile { source, .. } =>
				assert_eq!(source.path().to_string(), "pollMaxAttempts"),
			other => panic!("Unexpected error: {other:?}"),
		}

		let _ = fs::remove_file(&path);
	}
}
