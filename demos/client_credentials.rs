//! Demonstrates an authenticated client talking to a mock service: the first token is fetched at
//! construction, reused across calls, and replaced once when the service revokes it.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use m2m_api_client::{ApiClient, Credentials, http::ReqwestTransport, reqwest::Client, url::Url};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token").body(
				"client_id=demo-client&client_secret=super-secret&grant_type=client_credentials",
			);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":900}");
		})
		.await;
	let widgets_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/widgets").header("authorization", "Bearer demo-access");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "id": 1, "name": "gear" }]));
		})
		.await;
	let search_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/search").query_param("name", "gear");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!([{ "id": 1, "name": "gear" }]));
		})
		.await;
	let create_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/widgets").json_body(json!({ "name": "cog" }));
			then.status(201)
				.header("content-type", "application/json")
				.json_body(json!({ "id": 2, "name": "cog" }));
		})
		.await;
	let delete_mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/widgets/2");
			then.status(204);
		})
		.await;
	let credentials = Credentials::new(
		"demo-client",
		"super-secret",
		"client_credentials",
		Url::parse(&server.url("/oauth/token"))?,
		Url::parse(&server.url("/api"))?,
	);
	let transport =
		ReqwestTransport::with_client(Client::builder().timeout(Duration::from_secs(5)).build()?);
	let client = ApiClient::builder(credentials).transport(Arc::new(transport)).build().await?;
	let listed: Value = client.get("/widgets").await?;
	let found: Value = client.get_with_query("/search", &[("name", "gear")][..]).await?;
	let created: Value = client.post("/widgets", &json!({ "name": "cog" })).await?;
	let deleted: Option<Value> = client.delete("/widgets/2").await?;

	println!("Listed: {listed}.");
	println!("Found: {found}.");
	println!("Created: {created}.");
	println!("Deleted body: {deleted:?}.");
	println!("Token exchanges: {}.", client.token_guard().metrics().attempts());

	token_mock.assert_async().await;
	widgets_mock.assert_async().await;
	search_mock.assert_async().await;
	create_mock.assert_async().await;
	delete_mock.assert_async().await;

	Ok(())
}
