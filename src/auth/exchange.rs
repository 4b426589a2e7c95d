//! Client-credentials exchange against the token endpoint.
//!
//! [`TokenExchange::exchange`] posts the configured credentials as an
//! `application/x-www-form-urlencoded` body, validates the JSON reply, and writes the resulting
//! [`TokenRecord`] to the store in a single `save`. Every failure path returns before the store is
//! touched, so a failed exchange never disturbs the previously cached token.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use ::http::{
	Method,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	config::Credentials,
	error::{AuthExchangeError, RequestError},
	http::{self, HttpRequest, HttpTransport},
	obs::{self, Operation},
	store::TokenStore,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Serialize)]
struct ExchangeForm<'a> {
	client_id: &'a str,
	client_secret: &'a str,
	grant_type: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: u64,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
	error: Option<String>,
	error_description: Option<String>,
}

/// Running totals for the exchanges issued by one client.
///
/// Rejections are the subset of failures where the token endpoint answered with a non-2xx
/// status; the rest are transport or response-validation failures.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	rejections: AtomicU64,
	failures: AtomicU64,
}
impl ExchangeMetrics {
	/// Requests sent to the token endpoint.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Exchanges that stored a new token.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Exchanges the token endpoint refused.
	pub fn rejections(&self) -> u64 {
		self.rejections.load(Ordering::Relaxed)
	}

	/// Exchanges that failed for any reason, rejections included.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	fn record(&self, result: &Result<TokenSecret>) {
		self.attempts.fetch_add(1, Ordering::Relaxed);

		let counter = match result {
			Ok(_) => &self.successes,
			Err(err) => {
				if matches!(err, Error::AuthExchange(AuthExchangeError::Rejected { .. })) {
					self.rejections.fetch_add(1, Ordering::Relaxed);
				}

				&self.failures
			},
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

/// Performs client-credentials exchanges and records the result in a [`TokenStore`].
///
/// The exchange never consults the store before calling the endpoint; staleness checks belong to
/// [`TokenGuard`](crate::auth::TokenGuard).
#[derive(Clone)]
pub struct TokenExchange {
	credentials: Arc<Credentials>,
	transport: Arc<dyn HttpTransport>,
	store: Arc<dyn TokenStore>,
	metrics: Arc<ExchangeMetrics>,
}
impl TokenExchange {
	/// Creates an exchange bound to the provided credentials, transport, and store.
	pub fn new(
		credentials: Arc<Credentials>,
		transport: Arc<dyn HttpTransport>,
		store: Arc<dyn TokenStore>,
	) -> Self {
		Self { credentials, transport, store, metrics: Default::default() }
	}

	/// Store receiving every successfully issued token.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		&self.store
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &ExchangeMetrics {
		&self.metrics
	}

	/// Exchanges the configured credentials for a fresh access token.
	///
	/// Exactly one request reaches the token endpoint per call. On success the new token and its
	/// absolute expiry replace the stored record; on failure the store is left as it was.
	pub async fn exchange(&self) -> Result<TokenSecret> {
		obs::observe(Operation::TokenExchange, "exchange", async {
			let result = self.exchange_once().await;

			self.metrics.record(&result);

			result
		})
		.await
	}

	async fn exchange_once(&self) -> Result<TokenSecret> {
		let request = self.build_request()?;
		let response = self
			.transport
			.send(request)
			.await
			.map_err(|source| AuthExchangeError::Unreachable { source })?;
		let status = response.status();

		if !status.is_success() {
			return Err(rejection(status.as_u16(), response.body()).into());
		}

		let record =
			parse_token_response(status.as_u16(), response.body(), OffsetDateTime::now_utc())?;
		let token = record.access_token.clone();

		self.store.save(record);

		Ok(token)
	}

	fn build_request(&self) -> Result<HttpRequest> {
		let form = serde_urlencoded::to_string(ExchangeForm {
			client_id: &self.credentials.client_id,
			client_secret: self.credentials.client_secret.expose(),
			grant_type: &self.credentials.grant_type,
		})
		.map_err(RequestError::from)?;
		let request = ::http::Request::builder()
			.method(Method::POST)
			.uri(self.credentials.auth_url.as_str())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_CONTENT_TYPE)
			.body(form.into_bytes())
			.map_err(RequestError::from)?;

		Ok(request)
	}
}
impl Debug for TokenExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchange")
			.field("credentials", &self.credentials)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}

fn rejection(status: u16, body: &[u8]) -> AuthExchangeError {
	let message = serde_json::from_slice::<OAuthErrorBody>(body)
		.ok()
		.and_then(|parsed| parsed.error_description.or(parsed.error))
		.unwrap_or_else(|| http::body_preview(body));

	AuthExchangeError::Rejected { status, message }
}

fn parse_token_response(
	status: u16,
	body: &[u8],
	issued_at: OffsetDateTime,
) -> Result<TokenRecord, AuthExchangeError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let response: TokenResponse = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthExchangeError::MalformedResponse { source, status })?;

	if response.access_token.trim().is_empty() {
		return Err(AuthExchangeError::EmptyAccessToken);
	}
	if response.expires_in == 0 {
		return Err(AuthExchangeError::NonPositiveExpiresIn);
	}

	let expires_in = i64::try_from(response.expires_in)
		.map_err(|_| AuthExchangeError::ExpiresInOutOfRange)?;
	let expires_at = issued_at
		.checked_add(Duration::seconds(expires_in))
		.ok_or(AuthExchangeError::ExpiresInOutOfRange)?;

	Ok(TokenRecord { access_token: TokenSecret::new(response.access_token), issued_at, expires_at })
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{_preludet::*, store::MemoryStore};

	fn exchange_with(transport: &Arc<ScriptedTransport>, store: &MemoryStore) -> TokenExchange {
		TokenExchange::new(
			Arc::new(test_credentials()),
			transport.clone(),
			Arc::new(store.clone()),
		)
	}

	fn prior_record() -> TokenRecord {
		TokenRecord::issued("old-token", OffsetDateTime::now_utc(), Duration::seconds(30))
	}

	#[tokio::test]
	async fn successful_exchange_posts_form_and_stores_record() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::default();

		transport.token("tok-1", 3600);

		let before = OffsetDateTime::now_utc();
		let token = exchange_with(&transport, &store)
			.exchange()
			.await
			.expect("Exchange against a 200 response should succeed.");

		assert_eq!(token.expose(), "tok-1");

		let stored = store.load().expect("Successful exchange should populate the store.");

		assert_eq!(stored.access_token.expose(), "tok-1");
		assert!(stored.expires_at >= before + Duration::seconds(3600));
		assert!(stored.expires_at <= OffsetDateTime::now_utc() + Duration::seconds(3600));

		let requests = transport.requests();

		assert_eq!(requests.len(), 1);
		assert_eq!(requests[0].method, "POST");
		assert_eq!(requests[0].uri, "https://auth.example.com/oauth/token");
		assert_eq!(requests[0].header("content-type"), Some(FORM_CONTENT_TYPE));
		assert_eq!(requests[0].header("accept"), Some(JSON_CONTENT_TYPE));
		assert_eq!(
			requests[0].body_text(),
			"client_id=client-id&client_secret=client-secret&grant_type=client_credentials"
		);
		assert_eq!(requests[0].authorization(), None);
	}

	#[tokio::test]
	async fn rejected_exchange_leaves_prior_record_untouched() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::with_record(prior_record());
		let exchange = exchange_with(&transport, &store);

		transport.respond(
			401,
			r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#,
		);

		let err = exchange.exchange().await.expect_err("A 401 from the token endpoint should fail.");

		match err {
			Error::AuthExchange(AuthExchangeError::Rejected { status, message }) => {
				assert_eq!(status, 401);
				assert_eq!(message, "Client authentication failed");
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		let stored = store.load().expect("Prior record should survive a failed exchange.");

		assert_eq!(stored.access_token.expose(), "old-token");
		assert_eq!(exchange.metrics().attempts(), 1);
		assert_eq!(exchange.metrics().rejections(), 1);
		assert_eq!(exchange.metrics().failures(), 1);
		assert_eq!(transport.requests().len(), 1);
	}

	#[tokio::test]
	async fn rejection_without_oauth_body_uses_body_preview() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::default();

		transport.respond(503, "upstream unavailable");

		let err = exchange_with(&transport, &store)
			.exchange()
			.await
			.expect_err("A 503 from the token endpoint should fail.");

		assert!(matches!(
			err,
			Error::AuthExchange(AuthExchangeError::Rejected { status: 503, ref message })
				if message == "upstream unavailable"
		));
		assert!(store.load().is_none());
	}

	#[tokio::test]
	async fn unreachable_endpoint_is_reported_without_store_write() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::with_record(prior_record());

		transport.fail("connection refused");

		let exchange = exchange_with(&transport, &store);
		let err = exchange
			.exchange()
			.await
			.expect_err("Transport failures should surface as exchange errors.");

		assert!(matches!(err, Error::AuthExchange(AuthExchangeError::Unreachable { .. })));
		assert_eq!(exchange.metrics().failures(), 1);
		assert_eq!(exchange.metrics().rejections(), 0);
		assert_eq!(
			store.load().expect("Prior record should survive.").access_token.expose(),
			"old-token"
		);
	}

	#[tokio::test]
	async fn malformed_success_body_is_rejected() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::default();

		transport.respond(200, r#"{"access_token":"tok","expires_in":"soon"}"#);

		let err = exchange_with(&transport, &store)
			.exchange()
			.await
			.expect_err("Non-numeric expires_in should be rejected.");

		match err {
			Error::AuthExchange(AuthExchangeError::MalformedResponse { source, status }) => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "expires_in");
			},
			other => panic!("Unexpected error: {other:?}."),
		}

		assert!(store.load().is_none());
	}

	#[test]
	fn token_response_validation() {
		let issued_at = macros::datetime!(2025-01-01 00:00 UTC);
		let record =
			parse_token_response(200, br#"{"access_token":"a","expires_in":60}"#, issued_at)
				.expect("Valid token response should parse.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 00:01 UTC));
		assert!(matches!(
			parse_token_response(200, br#"{"access_token":"a","expires_in":0}"#, issued_at),
			Err(AuthExchangeError::NonPositiveExpiresIn)
		));
		assert!(matches!(
			parse_token_response(200, br#"{"access_token":" ","expires_in":60}"#, issued_at),
			Err(AuthExchangeError::EmptyAccessToken)
		));
		assert!(matches!(
			parse_token_response(
				200,
				br#"{"access_token":"a","expires_in":18446744073709551615}"#,
				issued_at
			),
			Err(AuthExchangeError::ExpiresInOutOfRange)
		));
	}
}
