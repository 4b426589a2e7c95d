#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
use m2m_api_client::{
	ApiClient, Error,
	_preludet::test_credentials_for,
	error::AuthExchangeError,
};
use time::{Duration, OffsetDateTime};

const FORM_BODY: &str =
	"client_id=client-id&client_secret=client-secret&grant_type=client_credentials";

#[tokio::test]
async fn first_call_exchanges_once_and_caches_for_the_token_lifetime() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("content-type", "application/x-www-form-urlencoded")
				.header("accept", "application/json")
				.body(FORM_BODY);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"A","expires_in":3600}"#);
		})
		.await;
	let widgets = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/widgets").header("authorization", "Bearer A");
			then.status(200).header("content-type", "application/json").body("[1,2,3]");
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let client = ApiClient::connect(test_credentials_for(
		&server.url("/oauth/token"),
		&server.url("/api"),
	))
	.await
	.expect("Client should connect against the mock token endpoint.");

	for _ in 0..2 {
		let body: Vec<u32> = client.get("/widgets").await.expect("Widget listing should succeed.");

		assert_eq!(body, [1, 2, 3]);
	}

	token.assert_calls_async(1).await;
	widgets.assert_calls_async(2).await;

	let stored = client
		.token_guard()
		.store()
		.load()
		.expect("The exchanged token should be cached.");

	assert_eq!(stored.access_token.expose(), "A");
	assert!(stored.expires_at >= before + Duration::seconds(3600));
	assert!(stored.expires_at <= OffsetDateTime::now_utc() + Duration::seconds(3600));
}

#[tokio::test]
async fn rejected_credentials_abort_construction() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"Bad secret"}"#);
		})
		.await;
	let err = ApiClient::connect(test_credentials_for(
		&server.url("/oauth/token"),
		&server.url("/api"),
	))
	.await
	.expect_err("Rejected credentials should fail construction.");

	match err {
		Error::AuthExchange(AuthExchangeError::Rejected { status, message }) => {
			assert_eq!(status, 401);
			assert_eq!(message, "Bad secret");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	token.assert_calls_async(1).await;
}

#[tokio::test]
async fn token_response_without_expiry_is_malformed() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"A"}"#);
		})
		.await;
	let err = ApiClient::connect(test_credentials_for(
		&server.url("/oauth/token"),
		&server.url("/api"),
	))
	.await
	.expect_err("A token response without expires_in should be rejected.");

	assert!(matches!(
		err,
		Error::AuthExchange(AuthExchangeError::MalformedResponse { status: 200, .. })
	));
}

#[tokio::test]
async fn unreachable_token_endpoint_is_reported() {
	// Nothing listens on the discard port.
	let err = ApiClient::connect(test_credentials_for(
		"http://127.0.0.1:9/oauth/token",
		"http://127.0.0.1:9/api",
	))
	.await
	.expect_err("An unreachable token endpoint should fail construction.");

	assert!(matches!(err, Error::AuthExchange(AuthExchangeError::Unreachable { .. })));
}
