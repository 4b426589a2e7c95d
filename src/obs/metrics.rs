// self
use crate::{
	obs::{Operation, Outcome},
	pipeline::Attempt,
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"m2m_client_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

/// Counts one transmission to the target service, labeled by whether it was the original send or
/// the post-401 resubmission and by the response status class.
pub fn record_transmission(attempt: Attempt, status: u16) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"m2m_client_transmissions_total",
			"attempt" => attempt_label(attempt),
			"status" => status_class(status)
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (attempt, status);
	}
}

#[cfg(any(test, feature = "metrics"))]
fn attempt_label(attempt: Attempt) -> &'static str {
	if attempt.is_first() { "original" } else { "resubmission" }
}

#[cfg(any(test, feature = "metrics"))]
fn status_class(status: u16) -> &'static str {
	match status {
		401 => "401",
		200..=299 => "2xx",
		300..=399 => "3xx",
		400..=499 => "4xx",
		500..=599 => "5xx",
		_ => "other",
	}
}
