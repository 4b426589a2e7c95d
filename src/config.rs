//! Process-wide credentials loaded once at startup.
//!
//! [`Credentials::from_env`] reads the five required variables plus the optional refresh buffer.
//! Any missing or blank value fails with [`ConfigError`] before the client touches the network, so a
//! misconfigured process never starts serving traffic. [`Credentials::from_lookup`] performs the same
//! validation against an arbitrary key/value source, which keeps tests away from the process
//! environment.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Token endpoint URL.
pub const AUTH_URL: &str = "AUTH_URL";
/// Base URL of the target service.
pub const EXTERNAL_SERVICE_URL: &str = "EXTERNAL_SERVICE_URL";
/// OAuth 2.0 client identifier.
pub const CLIENT_ID: &str = "CLIENT_ID";
/// OAuth 2.0 client secret.
pub const CLIENT_SECRET: &str = "CLIENT_SECRET";
/// Grant type sent to the token endpoint.
pub const GRANT_TYPE: &str = "GRANT_TYPE";
/// Optional override for the staleness buffer, in whole seconds.
pub const TOKEN_REFRESH_BUFFER_SECS: &str = "TOKEN_REFRESH_BUFFER_SECS";

/// Immutable client credentials and endpoint addresses.
#[derive(Clone)]
pub struct Credentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// Client secret; redacted from formatting output.
	pub client_secret: TokenSecret,
	/// Grant type posted with every exchange (normally `client_credentials`).
	pub grant_type: String,
	/// Token endpoint.
	pub auth_url: Url,
	/// Base URL every request path is appended to.
	pub service_url: Url,
	/// Staleness buffer override, when configured.
	pub refresh_buffer: Option<Duration>,
}
impl Credentials {
	/// Creates credentials from already-validated parts.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		grant_type: impl Into<String>,
		auth_url: Url,
		service_url: Url,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			grant_type: grant_type.into(),
			auth_url,
			service_url,
			refresh_buffer: None,
		}
	}

	/// Loads credentials from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads credentials through `lookup`, applying the same validation as [`Self::from_env`].
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name)
				.map(|value| value.trim().to_owned())
				.filter(|value| !value.is_empty())
				.ok_or(ConfigError::Missing { name })
		};
		let url = |name: &'static str| {
			required(name).and_then(|raw| {
				Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { name, source })
			})
		};
		let auth_url = url(AUTH_URL)?;
		let service_url = url(EXTERNAL_SERVICE_URL)?;
		let client_id = required(CLIENT_ID)?;
		let client_secret = required(CLIENT_SECRET)?;
		let grant_type = required(GRANT_TYPE)?;
		let refresh_buffer = match lookup(TOKEN_REFRESH_BUFFER_SECS)
			.map(|value| value.trim().to_owned())
			.filter(|value| !value.is_empty())
		{
			Some(raw) => {
				let secs = raw.parse::<u32>().map_err(|source| ConfigError::InvalidNumber {
					name: TOKEN_REFRESH_BUFFER_SECS,
					source,
				})?;

				Some(Duration::seconds(i64::from(secs)))
			},
			None => None,
		};

		Ok(Self {
			refresh_buffer,
			..Self::new(client_id, client_secret, grant_type, auth_url, service_url)
		})
	}

	/// Overrides the staleness buffer applied before the declared expiry.
	pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = Some(buffer);

		self
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("grant_type", &self.grant_type)
			.field("auth_url", &self.auth_url.as_str())
			.field("service_url", &self.service_url.as_str())
			.field("refresh_buffer", &self.refresh_buffer)
			.finish()
	}
}
