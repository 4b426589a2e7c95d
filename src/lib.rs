//! Authenticated HTTP client for OAuth 2.0 machine-to-machine APIs: cached client-credentials
//! tokens, per-request bearer stamping, and a single refresh-and-retry when a service answers 401.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod pipeline;
pub mod store;

pub use client::{ApiClient, ApiClientBuilder, ApiRequest, ApiResponse};
pub use config::Credentials;
pub use error::{Error, Result};

#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Scripted transport and credential fixtures for unit and integration tests; enabled via
	//! `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		config::Credentials,
		error::TransportError,
		http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	};

	/// Authorization server host used by [`test_credentials`].
	pub const TEST_AUTH_URL: &str = "https://auth.example.com/oauth/token";
	/// Service base URL used by [`test_credentials`].
	pub const TEST_SERVICE_URL: &str = "https://api.example.com/v1";

	/// Builds credentials pointing at unroutable example hosts.
	pub fn test_credentials() -> Credentials {
		test_credentials_for(TEST_AUTH_URL, TEST_SERVICE_URL)
	}

	/// Builds credentials for the given token endpoint and service base URL.
	pub fn test_credentials_for(auth_url: &str, service_url: &str) -> Credentials {
		Credentials::new(
			"client-id",
			"client-secret",
			"client_credentials",
			Url::parse(auth_url).expect("Auth URL fixture should parse."),
			Url::parse(service_url).expect("Service URL fixture should parse."),
		)
	}

	/// Request as observed by [`ScriptedTransport`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// Request method.
		pub method: String,
		/// Absolute request URI.
		pub uri: String,
		/// Headers as transmitted.
		pub headers: ::http::HeaderMap,
		/// Raw payload.
		pub body: Vec<u8>,
	}
	impl RecordedRequest {
		/// `Authorization` header value, if present.
		pub fn authorization(&self) -> Option<&str> {
			self.header(::http::header::AUTHORIZATION.as_str())
		}

		/// Header value by name, if present and visible ASCII.
		pub fn header(&self, name: &str) -> Option<&str> {
			self.headers.get(name).and_then(|value| value.to_str().ok())
		}

		/// Payload decoded lossily as UTF-8.
		pub fn body_text(&self) -> String {
			String::from_utf8_lossy(&self.body).into_owned()
		}

		/// Returns `true` when the request targeted the fixture token endpoint.
		pub fn is_token_call(&self) -> bool {
			self.uri.starts_with("https://auth.example.com/")
		}
	}

	/// Replays queued responses in order and records every request it receives.
	#[derive(Default)]
	pub struct ScriptedTransport {
		responses: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
		requests: Mutex<Vec<RecordedRequest>>,
	}
	impl ScriptedTransport {
		/// Queues a JSON response with the given status.
		pub fn respond(&self, status: u16, body: &str) -> &Self {
			let response = ::http::Response::builder()
				.status(status)
				.header("content-type", "application/json")
				.body(body.as_bytes().to_vec())
				.expect("Scripted response should build.");

			self.responses.lock().push_back(Ok(response));

			self
		}

		/// Queues a successful token endpoint reply.
		pub fn token(&self, token: &str, expires_in: u64) -> &Self {
			self.respond(
				200,
				&format!("{{\"access_token\":\"{token}\",\"expires_in\":{expires_in}}}"),
			)
		}

		/// Queues a network failure.
		pub fn fail(&self, message: &str) -> &Self {
			let error = std::io::Error::other(message.to_owned());

			self.responses.lock().push_back(Err(TransportError::network(error)));

			self
		}

		/// Every request received so far, in order.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		/// Requests sent to the target service, excluding token exchanges.
		pub fn service_calls(&self) -> Vec<RecordedRequest> {
			self.requests().into_iter().filter(|request| !request.is_token_call()).collect()
		}

		/// Number of token exchanges performed.
		pub fn token_calls(&self) -> usize {
			self.requests.lock().iter().filter(|request| request.is_token_call()).count()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
			let (parts, body) = request.into_parts();

			self.requests.lock().push(RecordedRequest {
				method: parts.method.to_string(),
				uri: parts.uri.to_string(),
				headers: parts.headers,
				body,
			});

			let next = self.responses.lock().pop_front();

			Box::pin(async move {
				next.unwrap_or_else(|| {
					Err(TransportError::network(std::io::Error::other("script exhausted")))
				})
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
