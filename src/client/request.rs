//! Immutable description of one logical call to the target service.

// crates.io
use ::http::{HeaderMap, HeaderName, HeaderValue, Method};
// self
use crate::{_prelude::*, error::RequestError};

/// Method, path, query, headers, and body of a service call.
///
/// The request is reused verbatim for a resubmission after a 401; only the `Authorization` header
/// is recomputed per transmission.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	method: Method,
	path: String,
	query: Option<String>,
	headers: HeaderMap,
	body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request for `path`, relative to the service base URL.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: None, headers: HeaderMap::new(), body: None }
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends form-encoded query parameters.
	pub fn query<Q>(mut self, query: &Q) -> Result<Self>
	where
		Q: ?Sized + Serialize,
	{
		let encoded = serde_urlencoded::to_string(query).map_err(RequestError::from)?;

		if encoded.is_empty() {
			return Ok(self);
		}

		self.query = Some(match self.query.take() {
			Some(existing) => format!("{existing}&{encoded}"),
			None => encoded,
		});

		Ok(self)
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(RequestError::Body)?);

		Ok(self)
	}

	/// Uses raw bytes as the payload.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Sets a per-request header, overriding the client default of the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// HTTP method.
	pub fn method(&self) -> &Method {
		&self.method
	}

	/// Path relative to the service base URL.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Encoded query string, if any.
	pub fn query_string(&self) -> Option<&str> {
		self.query.as_deref()
	}

	/// Per-request headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Payload bytes, if any.
	pub fn body_bytes(&self) -> Option<&[u8]> {
		self.body.as_deref()
	}

	/// Resolves the absolute URL by appending the path to `base`.
	///
	/// Exactly one `/` separates the base path from the request path, whatever slashes either side
	/// carries, so `https://api.example.com/v1` plus `/widgets` yields `.../v1/widgets`.
	pub fn resolve(&self, base: &Url) -> Result<Url, RequestError> {
		let joined = format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			self.path.trim_start_matches('/')
		);
		let mut url = Url::parse(&joined)
			.map_err(|source| RequestError::InvalidPath { path: self.path.clone(), source })?;

		if let Some(query) = &self.query {
			let combined = match url.query() {
				Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
				_ => query.clone(),
			};

			url.set_query(Some(&combined));
		}

		Ok(url)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::BTreeMap;
	// self
	use super::*;

	fn base(raw: &str) -> Url {
		Url::parse(raw).expect("Base URL fixture should parse.")
	}

	#[test]
	fn resolve_joins_with_single_slash() {
		let request = ApiRequest::get("/widgets/42");

		for raw in ["https://api.example.com/v1", "https://api.example.com/v1/"] {
			let url = request.resolve(&base(raw)).expect("Join should succeed.");

			assert_eq!(url.as_str(), "https://api.example.com/v1/widgets/42");
		}
		assert_eq!(
			ApiRequest::get("widgets")
				.resolve(&base("https://api.example.com"))
				.expect("Join should succeed.")
				.as_str(),
			"https://api.example.com/widgets"
		);
	}

	#[test]
	fn query_parameters_are_encoded_and_appended() {
		let mut params = BTreeMap::new();

		params.insert("name", "a b");
		params.insert("page", "2");

		let tags: &[(&str, &str)] = &[("tag", "x&y")];
		let request = ApiRequest::get("/search")
			.query(&params)
			.and_then(|request| request.query(tags))
			.expect("Query encoding should succeed.");

		assert_eq!(request.query_string(), Some("name=a+b&page=2&tag=x%26y"));
		assert_eq!(
			request
				.resolve(&base("https://api.example.com"))
				.expect("Join should succeed.")
				.as_str(),
			"https://api.example.com/search?name=a+b&page=2&tag=x%26y"
		);
	}

	#[test]
	fn json_body_and_headers_are_kept() {
		let request = ApiRequest::post("/widgets")
			.json(&serde_json::json!({ "name": "gear" }))
			.expect("JSON encoding should succeed.")
			.header(HeaderName::from_static("x-trace"), HeaderValue::from_static("abc"));

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.body_bytes(), Some(br#"{"name":"gear"}"#.as_slice()));
		assert_eq!(request.headers().get("x-trace").and_then(|v| v.to_str().ok()), Some("abc"));
	}
}
