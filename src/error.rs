//! Client-level error types shared by configuration, the token exchange, and request dispatch.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Startup configuration is missing or invalid; the client must not serve traffic.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The token endpoint was unreachable or rejected the credential exchange.
	#[error(transparent)]
	AuthExchange(#[from] AuthExchangeError),
	/// The target service answered with a non-success status.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Transport failure (DNS, TCP, TLS) while calling the target service.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Request could not be built or its response could not be decoded.
	#[error(transparent)]
	Request(#[from] RequestError),
}
impl Error {
	/// Returns the HTTP status carried by upstream or token endpoint failures.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Upstream(err) => Some(err.status),
			Self::AuthExchange(AuthExchangeError::Rejected { status, .. }) => Some(*status),
			Self::AuthExchange(AuthExchangeError::MalformedResponse { status, .. }) =>
				Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the target service rejected the request with 401.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::Upstream(err) if err.is_unauthorized())
	}
}

/// Configuration failures raised while loading credentials or building the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required setting is absent or blank.
	#[error("Required configuration value `{name}` is missing.")]
	Missing {
		/// Name of the missing setting.
		name: &'static str,
	},
	/// A URL setting cannot be parsed.
	#[error("Configuration value `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Name of the offending setting.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A numeric setting cannot be parsed.
	#[error("Configuration value `{name}` is not a valid number.")]
	InvalidNumber {
		/// Name of the offending setting.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: std::num::ParseIntError,
	},
	/// No transport was supplied and the default reqwest transport is disabled.
	#[error("No HTTP transport is configured.")]
	MissingTransport,
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures of the client-credentials exchange against the token endpoint.
#[derive(Debug, ThisError)]
pub enum AuthExchangeError {
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the exchange with status {status}: {message}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// OAuth error description, error code, or a body preview.
		message: String,
	},
	/// Token endpoint could not be reached.
	#[error("Token endpoint could not be reached.")]
	Unreachable {
		/// Transport failure raised while calling the token endpoint.
		#[source]
		source: TransportError,
	},
	/// Token endpoint responded with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the malformed response.
		status: u16,
	},
	/// Token endpoint returned a blank access token.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// Token endpoint returned a zero lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an excessively large lifetime.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}

/// Non-success response from the target service, passed through to the caller unchanged.
#[derive(Debug, ThisError)]
#[error("Upstream service returned status {status}.")]
pub struct UpstreamError {
	/// HTTP status code returned by the service.
	pub status: u16,
	/// Response body, decoded lossily as UTF-8.
	pub body: String,
	/// Retry-After hint from upstream, if supplied.
	pub retry_after: Option<Duration>,
}
impl UpstreamError {
	/// Returns `true` for `401 Unauthorized`.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}
}

/// Transport-level failures (network, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up waiting for a response.
	#[error("Request timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// Request construction and response decoding failures.
#[derive(Debug, ThisError)]
pub enum RequestError {
	/// Request path cannot be appended to the service base URL.
	#[error("Request path `{path}` cannot be joined to the service base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: String,
		/// Underlying validation failure.
		#[source]
		source: http::header::InvalidHeaderValue,
	},
	/// HTTP request assembly failed.
	#[error(transparent)]
	Build(#[from] http::Error),
	/// Request body cannot be serialized as JSON.
	#[error("Request body could not be serialized to JSON.")]
	Body(#[source] serde_json::Error),
	/// Query parameters cannot be form-encoded.
	#[error("Query parameters could not be encoded.")]
	Query(#[from] serde_urlencoded::ser::Error),
	/// Response body does not match the expected shape.
	#[error("Response body could not be decoded.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
}
