//! Cached access token record and its freshness rules.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Freshness of a token record relative to an instant and a staleness buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token stays valid beyond the buffer window.
	Active,
	/// Token is still valid but expires within the buffer window.
	Expiring,
	/// Token reached its expiry instant.
	Expired,
}

/// Access token paired with its absolute expiry.
///
/// The token and its expiry live in one value so a store can only ever hold both or neither.
#[derive(Clone)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// Issued-at plus the server-declared lifetime.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record from an issuance instant and a relative lifetime.
	pub fn issued(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			issued_at,
			expires_at: issued_at + expires_in,
		}
	}

	/// Computes the freshness status at `instant`, treating the last `buffer` before expiry as
	/// [`TokenStatus::Expiring`].
	pub fn status_at(&self, instant: OffsetDateTime, buffer: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}
		// A buffer reaching past the representable range covers the whole lifetime.
		match self.expires_at.checked_sub(buffer) {
			Some(threshold) if instant < threshold => TokenStatus::Active,
			_ => TokenStatus::Expiring,
		}
	}

	/// Returns `true` when the record must be replaced before use at `instant`.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, buffer: Duration) -> bool {
		!matches!(self.status_at(instant, buffer), TokenStatus::Active)
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
