//! Buffered response returned to callers.

// crates.io
use ::http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{RequestError, UpstreamError},
	http::{self, HttpResponse},
};

/// Final response of a logical call, after any 401 resubmission.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	status: StatusCode,
	headers: HeaderMap,
	body: Vec<u8>,
}
impl ApiResponse {
	/// Status code.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Raw body bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.body
	}

	/// Body decoded lossily as UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the body as JSON; an empty body decodes as `null`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body: &[u8] =
			if self.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &self.body };
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			RequestError::Decode { source, status: self.status.as_u16() }.into()
		})
	}

	/// Converts a non-success status into [`UpstreamError`], keeping body and `Retry-After`.
	pub fn error_for_status(self) -> Result<Self> {
		if self.status.is_success() {
			return Ok(self);
		}

		Err(UpstreamError {
			status: self.status.as_u16(),
			retry_after: http::parse_retry_after(&self.headers),
			body: String::from_utf8_lossy(&self.body).into_owned(),
		}
		.into())
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}
