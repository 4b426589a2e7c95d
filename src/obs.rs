//! Optional observability helpers for client operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `m2m_client.op` with the `op` (operation) and
//!   `stage` (call site) fields.
//! - Enable `metrics` to increment the `m2m_client_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`, and the
//!   `m2m_client_transmissions_total` counter for every send to the target service, labeled by
//!   `attempt` (original or resubmission) + `status` class.
//!
//! Without either feature every helper compiles down to a no-op.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Client operations observed by the instrumentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Client-credentials exchange against the token endpoint.
	TokenExchange,
	/// Logical call to the target service, including its retry.
	Request,
	/// Forced refresh plus resubmission after a 401.
	AuthRetry,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::TokenExchange => "token_exchange",
			Operation::Request => "request",
			Operation::AuthRetry => "auth_retry",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Runs `fut` inside an operation span and records attempt plus success/failure outcomes.
pub(crate) async fn observe<T, Fut>(op: Operation, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(op, stage);

	record_outcome(op, Outcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => record_outcome(op, Outcome::Success),
		Err(_) => record_outcome(op, Outcome::Failure),
	}

	result
}
