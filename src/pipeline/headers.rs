//! Caller-supplied headers computed per transmission.

// crates.io
use ::http::{HeaderMap, HeaderName, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	client::ApiRequest,
	pipeline::{Attempt, InterceptFuture, RequestInterceptor},
};

/// Produces extra headers for each outbound request.
///
/// Any closure `Fn(&ApiRequest) -> HeaderMap` qualifies. Generated headers replace defaults of
/// the same name, except `Authorization`, which always carries the client's bearer token.
pub trait HeaderGenerator
where
	Self: Send + Sync,
{
	/// Returns the headers to merge into the request about to be sent.
	fn generate(&self, request: &ApiRequest) -> HeaderMap;
}
impl<F> HeaderGenerator for F
where
	F: Send + Sync + Fn(&ApiRequest) -> HeaderMap,
{
	fn generate(&self, request: &ApiRequest) -> HeaderMap {
		self(request)
	}
}

/// Before-send interceptor that merges a [`HeaderGenerator`]'s output into every transmission.
#[derive(Clone)]
pub struct CustomHeaders {
	generator: Arc<dyn HeaderGenerator>,
}
impl CustomHeaders {
	/// Wraps `generator`.
	pub fn new(generator: Arc<dyn HeaderGenerator>) -> Self {
		Self { generator }
	}
}
impl RequestInterceptor for CustomHeaders {
	fn before_send<'a>(
		&'a self,
		request: &'a ApiRequest,
		_attempt: Attempt,
		headers: &'a mut HeaderMap,
	) -> InterceptFuture<'a, ()> {
		overlay(headers, self.generator.generate(request), Some(&AUTHORIZATION));

		Box::pin(async { Ok(()) })
	}
}
impl Debug for CustomHeaders {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CustomHeaders").finish_non_exhaustive()
	}
}

/// Copies `source` into `target`, replacing every name it carries while keeping multi-valued
/// headers intact. Headers named `skip` are ignored.
pub(crate) fn overlay(target: &mut HeaderMap, source: HeaderMap, skip: Option<&HeaderName>) {
	let mut current: Option<HeaderName> = None;

	for (name, value) in source {
		// `None` means another value for the previous name.
		let first = name.is_some();

		if let Some(name) = name {
			current = Some(name);
		}

		let Some(name) = current.as_ref() else { continue };

		if skip == Some(name) {
			continue;
		}
		if first {
			target.insert(name.clone(), value);
		} else {
			target.append(name.clone(), value);
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::{HeaderValue, header::CONTENT_TYPE};
	// self
	use super::*;

	fn defaults() -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer real"));

		headers
	}

	#[tokio::test]
	async fn generator_cannot_override_authorization() {
		let interceptor = CustomHeaders::new(Arc::new(|request: &ApiRequest| {
			let mut headers = HeaderMap::new();

			headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer forged"));
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
			headers.insert(
				HeaderName::from_static("x-path"),
				HeaderValue::from_str(request.path()).expect("Paths should be valid headers."),
			);

			headers
		}));
		let mut headers = defaults();

		interceptor
			.before_send(&ApiRequest::get("/widgets"), Attempt::first(), &mut headers)
			.await
			.expect("Custom headers should merge.");

		assert_eq!(
			headers.get(AUTHORIZATION).expect("Authorization should survive."),
			"Bearer real"
		);
		assert_eq!(headers.get(CONTENT_TYPE).expect("Content-Type should be set."), "text/plain");
		assert_eq!(headers.get("x-path").expect("Generated header should be set."), "/widgets");
	}

	#[test]
	fn overlay_keeps_every_value_of_multi_valued_headers() {
		let mut source = HeaderMap::new();

		source.append("x-tag", HeaderValue::from_static("a"));
		source.append("x-tag", HeaderValue::from_static("b"));

		let mut target = HeaderMap::new();

		target.insert("x-tag", HeaderValue::from_static("old"));
		overlay(&mut target, source, None);

		let values = target.get_all("x-tag").iter().collect::<Vec<_>>();

		assert_eq!(values, ["a", "b"]);
	}
}
