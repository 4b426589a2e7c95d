//! Ordered request/response interceptors applied around every transmission.
//!
//! A logical call is transmitted at most [`Attempt::MAX`] times. Before each transmission every
//! [`RequestInterceptor`] edits the outbound headers in registration order. After each response
//! every [`ResponseInterceptor`] either lets it pass or asks for one resubmission, which the client
//! honors only while another attempt is available.

pub mod auth_retry;
pub mod bearer;
pub mod headers;

pub use auth_retry::AuthRetry;
pub use bearer::BearerInterceptor;
pub use headers::{CustomHeaders, HeaderGenerator};

// crates.io
use ::http::HeaderMap;
// self
use crate::{_prelude::*, client::ApiRequest, http::HttpResponse};

/// Boxed future returned by interceptors.
pub type InterceptFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// One-based index of a transmission within a logical call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempt(u8);
impl Attempt {
	/// Maximum number of transmissions per logical call: the original plus one resubmission.
	pub const MAX: u8 = 2;

	/// The original transmission.
	pub const fn first() -> Self {
		Self(1)
	}

	/// One-based attempt number.
	pub const fn number(self) -> u8 {
		self.0
	}

	/// Returns `true` for the original transmission.
	pub const fn is_first(self) -> bool {
		self.0 == 1
	}

	/// Returns the following attempt, or `None` once [`Self::MAX`] is reached.
	pub fn next(self) -> Option<Self> {
		(self.0 < Self::MAX).then_some(Self(self.0 + 1))
	}
}

/// Outcome of a [`ResponseInterceptor`].
#[derive(Debug)]
pub enum ResponseAction {
	/// Keep the response and continue with the next interceptor.
	Complete(HttpResponse),
	/// Resubmit `request`; `rejected` is surfaced instead if no attempt remains.
	Retry {
		/// Request to transmit next.
		request: ApiRequest,
		/// Response that prompted the resubmission.
		rejected: HttpResponse,
	},
}

/// Hook run before each transmission.
pub trait RequestInterceptor
where
	Self: Send + Sync,
{
	/// Edits `headers`, which already hold the client defaults merged with the request headers.
	fn before_send<'a>(
		&'a self,
		request: &'a ApiRequest,
		attempt: Attempt,
		headers: &'a mut HeaderMap,
	) -> InterceptFuture<'a, ()>;
}

/// Hook run on each received response, whatever its status.
pub trait ResponseInterceptor
where
	Self: Send + Sync,
{
	/// Inspects `response` and decides whether the call should be resubmitted.
	fn on_response<'a>(
		&'a self,
		request: &'a ApiRequest,
		attempt: Attempt,
		response: HttpResponse,
	) -> InterceptFuture<'a, ResponseAction>;
}

/// Ordered interceptor chains owned by a client.
#[derive(Clone, Default)]
pub struct Pipeline {
	before: Vec<Arc<dyn RequestInterceptor>>,
	after: Vec<Arc<dyn ResponseInterceptor>>,
}
impl Pipeline {
	/// Appends a before-send interceptor.
	pub fn push_request(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
		self.before.push(interceptor);
	}

	/// Appends an on-response interceptor.
	pub fn push_response(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
		self.after.push(interceptor);
	}

	/// Runs every before-send interceptor in order.
	pub async fn prepare(
		&self,
		request: &ApiRequest,
		attempt: Attempt,
		headers: &mut HeaderMap,
	) -> Result<()> {
		for interceptor in &self.before {
			interceptor.before_send(request, attempt, headers).await?;
		}

		Ok(())
	}

	/// Runs on-response interceptors in order, stopping at the first retry request.
	pub async fn settle(
		&self,
		request: &ApiRequest,
		attempt: Attempt,
		mut response: HttpResponse,
	) -> Result<ResponseAction> {
		for interceptor in &self.after {
			match interceptor.on_response(request, attempt, response).await? {
				ResponseAction::Complete(next) => response = next,
				retry @ ResponseAction::Retry { .. } => return Ok(retry),
			}
		}

		Ok(ResponseAction::Complete(response))
	}
}
impl Debug for Pipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("before", &self.before.len())
			.field("after", &self.after.len())
			.finish()
	}
}
