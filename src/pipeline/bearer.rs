//! Stamps every transmission with the guard's current bearer token.

// crates.io
use ::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::{TokenGuard, TokenSecret},
	client::ApiRequest,
	error::RequestError,
	pipeline::{Attempt, InterceptFuture, RequestInterceptor},
};

/// Before-send interceptor that asks the [`TokenGuard`] for a valid token and writes
/// `Authorization: Bearer <token>`, replacing any value already present.
///
/// A resubmission already carries the token minted by [`AuthRetry`](crate::pipeline::AuthRetry)
/// and is left untouched.
#[derive(Clone, Debug)]
pub struct BearerInterceptor {
	tokens: Arc<TokenGuard>,
}
impl BearerInterceptor {
	/// Creates an interceptor backed by `tokens`.
	pub fn new(tokens: Arc<TokenGuard>) -> Self {
		Self { tokens }
	}
}
impl RequestInterceptor for BearerInterceptor {
	fn before_send<'a>(
		&'a self,
		request: &'a ApiRequest,
		attempt: Attempt,
		headers: &'a mut HeaderMap,
	) -> InterceptFuture<'a, ()> {
		Box::pin(async move {
			if !attempt.is_first() && request.headers().contains_key(AUTHORIZATION) {
				return Ok(());
			}

			let token = self.tokens.valid_token().await?;

			headers.insert(AUTHORIZATION, bearer_header(&token)?);

			Ok(())
		})
	}
}

/// Renders `token` as a sensitive `Authorization` header value.
pub(crate) fn bearer_header(token: &TokenSecret) -> Result<HeaderValue, RequestError> {
	let mut value = HeaderValue::from_str(&token.bearer()).map_err(|source| {
		RequestError::InvalidHeader { name: AUTHORIZATION.to_string(), source }
	})?;

	value.set_sensitive(true);

	Ok(value)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::*,
		auth::{TokenExchange, TokenRecord},
		store::MemoryStore,
	};

	#[tokio::test]
	async fn overwrites_authorization_with_cached_token() {
		let transport = Arc::new(ScriptedTransport::default());
		let store = MemoryStore::with_record(TokenRecord::issued(
			"cached",
			OffsetDateTime::now_utc(),
			Duration::hours(1),
		));
		let guard = TokenGuard::new(TokenExchange::new(
			Arc::new(test_credentials()),
			transport.clone(),
			Arc::new(store),
		));
		let interceptor = BearerInterceptor::new(Arc::new(guard));
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer caller-supplied"));
		interceptor
			.before_send(&ApiRequest::get("/"), Attempt::first(), &mut headers)
			.await
			.expect("Stamping a cached token should succeed.");

		let value = headers.get(AUTHORIZATION).expect("Authorization should be set.");

		assert_eq!(value, "Bearer cached");
		assert!(value.is_sensitive());
		assert!(transport.requests().is_empty());
	}

	#[tokio::test]
	async fn resubmission_keeps_refreshed_token() {
		let transport = Arc::new(ScriptedTransport::default());
		let guard = TokenGuard::new(TokenExchange::new(
			Arc::new(test_credentials()),
			transport.clone(),
			Arc::new(MemoryStore::default()),
		));
		let interceptor = BearerInterceptor::new(Arc::new(guard));
		let request = ApiRequest::get("/")
			.header(AUTHORIZATION, HeaderValue::from_static("Bearer refreshed"));
		let retry = Attempt::first().next().expect("A second attempt should be available.");
		let mut headers = request.headers().clone();

		interceptor
			.before_send(&request, retry, &mut headers)
			.await
			.expect("Resubmissions should keep their token.");

		assert_eq!(
			headers.get(AUTHORIZATION).expect("Authorization should be kept."),
			"Bearer refreshed"
		);
		assert!(transport.requests().is_empty());
	}

	#[test]
	fn invalid_token_characters_are_rejected() {
		let err = bearer_header(&TokenSecret::new("line\nbreak"))
			.expect_err("Control characters cannot appear in header values.");

		assert!(matches!(
			err,
			RequestError::InvalidHeader { ref name, .. } if name == "authorization"
		));
	}
}
