//! Transport primitives shared by the token exchange and service requests.
//!
//! [`HttpTransport`] is the client's only dependency on an HTTP stack. Requests and responses cross
//! the seam as plain [`http`](::http) values with owned byte bodies, so the retry pipeline can be
//! driven by scripted transports in tests and downstream crates can plug in their own client.
//! [`ReqwestTransport`] is the default implementation.

// crates.io
use ::http::{HeaderMap, header::RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Outbound request with a fully buffered body.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Inbound response with a fully buffered body.
pub type HttpResponse = ::http::Response<Vec<u8>>;
/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

const BODY_PREVIEW_LIMIT: usize = 256;

/// Abstraction over HTTP transports able to execute a single request.
///
/// Implementations must not retry on their own; retry policy lives in the request pipeline.
/// Any received response, whatever its status, resolves to `Ok`. Only failures that prevent a
/// response from arriving resolve to [`TransportError`].
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok::<_, TransportError>(response_new)
		})
	}
}

/// Reads a `Retry-After` header expressed in seconds or as an RFC 2822 date.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// Decodes a response body for error reporting, truncated to a short preview.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= BODY_PREVIEW_LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_accepts_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(30)));
	}

	#[test]
	fn retry_after_ignores_past_dates_and_garbage() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("later"));

		assert_eq!(parse_retry_after(&headers), None);
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(long.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(body_preview(b"short"), "short");
	}
}
