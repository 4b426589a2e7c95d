//! Recovery from a 401: one forced refresh, then one resubmission.

// crates.io
use ::http::{StatusCode, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenGuard,
	client::ApiRequest,
	http::HttpResponse,
	obs::{self, Operation},
	pipeline::{Attempt, InterceptFuture, ResponseAction, ResponseInterceptor, bearer},
};

/// On-response interceptor handling `401 Unauthorized`.
///
/// A 401 on the original transmission forces a token exchange, regardless of the cached expiry,
/// and asks for the request to be resubmitted with the new token. A failed exchange is returned
/// as the call's error. A 401 on the resubmission passes through untouched, so the caller sees
/// the service's second rejection.
#[derive(Clone, Debug)]
pub struct AuthRetry {
	tokens: Arc<TokenGuard>,
}
impl AuthRetry {
	/// Creates an interceptor refreshing through `tokens`.
	pub fn new(tokens: Arc<TokenGuard>) -> Self {
		Self { tokens }
	}
}
impl ResponseInterceptor for AuthRetry {
	fn on_response<'a>(
		&'a self,
		request: &'a ApiRequest,
		attempt: Attempt,
		response: HttpResponse,
	) -> InterceptFuture<'a, ResponseAction> {
		Box::pin(async move {
			if response.status() != StatusCode::UNAUTHORIZED || !attempt.is_first() {
				return Ok(ResponseAction::Complete(response));
			}

			obs::observe(Operation::AuthRetry, "refresh", async {
				let token = self.tokens.refresh().await?;
				let retry = request.clone().header(AUTHORIZATION, bearer::bearer_header(&token)?);

				Ok(ResponseAction::Retry { request: retry, rejected: response })
			})
			.await
		})
	}
}
