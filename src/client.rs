//! Authenticated client for the target service.
//!
//! [`ApiClient`] owns a [`TokenGuard`], a transport, and the interceptor [`Pipeline`]. Every call
//! is stamped with a valid bearer token; a 401 on the original transmission forces one token
//! exchange and a single resubmission. Construction fetches the first token eagerly, so a client
//! that builds successfully has already proven its credentials against the token endpoint.

pub mod request;
pub mod response;

pub use request::ApiRequest;
pub use response::ApiResponse;

// crates.io
use ::http::{
	HeaderMap, HeaderValue,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{TokenExchange, TokenGuard},
	config::Credentials,
	error::{ConfigError, RequestError},
	http::{HttpRequest, HttpResponse, HttpTransport},
	obs::{self, Operation},
	pipeline::{
		Attempt, AuthRetry, BearerInterceptor, CustomHeaders, HeaderGenerator, Pipeline,
		RequestInterceptor, ResponseAction, ResponseInterceptor, bearer, headers::overlay,
	},
	store::{MemoryStore, TokenStore},
};

const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP client bound to one service base URL and one set of client credentials.
///
/// Cloning is cheap; clones share the token cache, transport, and pipeline.
#[derive(Clone)]
pub struct ApiClient {
	credentials: Arc<Credentials>,
	transport: Arc<dyn HttpTransport>,
	tokens: Arc<TokenGuard>,
	pipeline: Pipeline,
	default_headers: HeaderMap,
}
impl ApiClient {
	/// Starts configuring a client for `credentials`.
	pub fn builder(credentials: Credentials) -> ApiClientBuilder {
		ApiClientBuilder::new(credentials)
	}

	/// Builds a client with the default reqwest transport and in-memory store.
	#[cfg(feature = "reqwest")]
	pub async fn connect(credentials: Credentials) -> Result<Self> {
		Self::builder(credentials).build().await
	}

	/// Loads [`Credentials`] from the process environment and connects.
	///
	/// Missing settings fail with [`ConfigError`] before any network I/O.
	#[cfg(feature = "reqwest")]
	pub async fn from_env() -> Result<Self> {
		Self::connect(Credentials::from_env()?).await
	}

	/// Base URL request paths are appended to.
	pub fn base_url(&self) -> &Url {
		&self.credentials.service_url
	}

	/// Headers applied to every request before per-request and interceptor headers.
	pub fn default_headers(&self) -> &HeaderMap {
		&self.default_headers
	}

	/// Token guard shared by every clone of this client.
	pub fn token_guard(&self) -> &Arc<TokenGuard> {
		&self.tokens
	}

	/// `GET path`, decoding the JSON body.
	pub async fn get<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request(ApiRequest::get(path)).await
	}

	/// `GET path?query`, decoding the JSON body.
	pub async fn get_with_query<Q, T>(&self, path: &str, query: &Q) -> Result<T>
	where
		Q: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request(ApiRequest::get(path).query(query)?).await
	}

	/// `POST path` with a JSON body, decoding the JSON reply.
	pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request(ApiRequest::post(path).json(body)?).await
	}

	/// `PUT path` with a JSON body, decoding the JSON reply.
	pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request(ApiRequest::put(path).json(body)?).await
	}

	/// `PATCH path` with a JSON body, decoding the JSON reply.
	pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.request(ApiRequest::patch(path).json(body)?).await
	}

	/// `DELETE path`, decoding the JSON reply (an empty body decodes as `null`).
	pub async fn delete<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.request(ApiRequest::delete(path)).await
	}

	/// Sends `request` and decodes the success body as JSON.
	pub async fn request<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.send(request).await?.json()
	}

	/// Sends `request` and returns the raw success response.
	///
	/// Non-success statuses surface as [`UpstreamError`](crate::error::UpstreamError); a 401 that
	/// survives the single resubmission is returned the same way.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		obs::observe(Operation::Request, "send", async move {
			ApiResponse::from(self.dispatch(request).await?).error_for_status()
		})
		.await
	}

	async fn dispatch(&self, mut request: ApiRequest) -> Result<HttpResponse> {
		let mut attempt = Attempt::first();

		loop {
			let outbound = self.prepare(&request, attempt).await?;
			let response = self.transport.send(outbound).await?;

			obs::record_transmission(attempt, response.status().as_u16());

			match self.pipeline.settle(&request, attempt, response).await? {
				ResponseAction::Complete(response) => return Ok(response),
				ResponseAction::Retry { request: next, rejected } => match attempt.next() {
					Some(following) => {
						request = next;
						attempt = following;
					},
					None => return Ok(rejected),
				},
			}
		}
	}

	async fn prepare(&self, request: &ApiRequest, attempt: Attempt) -> Result<HttpRequest> {
		let url = request.resolve(&self.credentials.service_url)?;
		let mut headers = self.default_headers.clone();

		overlay(&mut headers, request.headers().clone(), None);
		self.pipeline.prepare(request, attempt, &mut headers).await?;

		let mut outbound = ::http::Request::builder()
			.method(request.method().clone())
			.uri(url.as_str())
			.body(request.body_bytes().map(<[u8]>::to_vec).unwrap_or_default())
			.map_err(RequestError::from)?;

		*outbound.headers_mut() = headers;

		Ok(outbound)
	}
}
impl Debug for ApiClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.credentials.service_url.as_str())
			.field("client_id", &self.credentials.client_id)
			.field("pipeline", &self.pipeline)
			.finish_non_exhaustive()
	}
}

/// Configures and constructs an [`ApiClient`].
pub struct ApiClientBuilder {
	credentials: Credentials,
	transport: Option<Arc<dyn HttpTransport>>,
	store: Option<Arc<dyn TokenStore>>,
	refresh_buffer: Option<Duration>,
	header_generator: Option<Arc<dyn HeaderGenerator>>,
	request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
	response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}
impl ApiClientBuilder {
	fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			transport: None,
			store: None,
			refresh_buffer: None,
			header_generator: None,
			request_interceptors: Vec::new(),
			response_interceptors: Vec::new(),
		}
	}

	/// Uses `transport` for both the token endpoint and the target service.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Uses `store` for the cached token instead of a private [`MemoryStore`].
	pub fn store(mut self, store: Arc<dyn TokenStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Overrides the refresh buffer, taking precedence over [`Credentials::refresh_buffer`].
	pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = Some(buffer);

		self
	}

	/// Installs a generator whose headers are merged into every request.
	pub fn header_generator(mut self, generator: impl 'static + HeaderGenerator) -> Self {
		self.header_generator = Some(Arc::new(generator));

		self
	}

	/// Appends a before-send interceptor, run after the built-in ones.
	pub fn request_interceptor(mut self, interceptor: impl 'static + RequestInterceptor) -> Self {
		self.request_interceptors.push(Arc::new(interceptor));

		self
	}

	/// Appends an on-response interceptor, run after the built-in 401 handling.
	pub fn response_interceptor(mut self, interceptor: impl 'static + ResponseInterceptor) -> Self {
		self.response_interceptors.push(Arc::new(interceptor));

		self
	}

	/// Fetches the first token and assembles the client.
	///
	/// Fails with the exchange error when the token endpoint is unreachable or rejects the
	/// credentials, so no client is returned without a working token.
	pub async fn build(self) -> Result<ApiClient> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => default_transport()?,
		};
		let credentials = Arc::new(self.credentials);
		let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::default()));
		let buffer = self
			.refresh_buffer
			.or(credentials.refresh_buffer)
			.unwrap_or(TokenGuard::DEFAULT_BUFFER);
		let exchange = TokenExchange::new(credentials.clone(), transport.clone(), store);
		let tokens = Arc::new(TokenGuard::new(exchange).with_buffer(buffer));
		let token = tokens.valid_token().await?;
		let mut default_headers = HeaderMap::new();

		default_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
		default_headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
		default_headers.insert(AUTHORIZATION, bearer::bearer_header(&token)?);

		let mut pipeline = Pipeline::default();

		pipeline.push_request(Arc::new(BearerInterceptor::new(tokens.clone())));

		if let Some(generator) = self.header_generator {
			pipeline.push_request(Arc::new(CustomHeaders::new(generator)));
		}

		for interceptor in self.request_interceptors {
			pipeline.push_request(interceptor);
		}

		pipeline.push_response(Arc::new(AuthRetry::new(tokens.clone())));

		for interceptor in self.response_interceptors {
			pipeline.push_response(interceptor);
		}

		Ok(ApiClient { credentials, transport, tokens, pipeline, default_headers })
	}
}
impl Debug for ApiClientBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClientBuilder")
			.field("credentials", &self.credentials)
			.field("custom_transport", &self.transport.is_some())
			.field("custom_store", &self.store.is_some())
			.field("refresh_buffer", &self.refresh_buffer)
			.field("header_generator", &self.header_generator.is_some())
			.finish_non_exhaustive()
	}
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

	Ok(Arc::new(ReqwestTransport::with_client(client)))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn HttpTransport>> {
	Err(ConfigError::MissingTransport.into())
}
