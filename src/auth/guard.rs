//! Staleness guard deciding when the cached token must be exchanged again.
//!
//! [`TokenGuard::valid_token`] returns the stored token while it is outside the refresh buffer and
//! otherwise performs one exchange. Callers that race on a stale token queue behind a singleflight
//! lock and re-check the store once they acquire it, so a burst of concurrent requests triggers a
//! single exchange instead of one per caller.

// self
use crate::{
	_prelude::*,
	auth::{ExchangeMetrics, TokenExchange, TokenSecret},
	store::TokenStore,
};

/// Serves valid access tokens, exchanging credentials whenever the cached one is stale.
#[derive(Debug)]
pub struct TokenGuard {
	exchange: TokenExchange,
	buffer: Duration,
	singleflight: AsyncMutex<()>,
}
impl TokenGuard {
	/// Default distance before expiry at which a token is treated as stale.
	pub const DEFAULT_BUFFER: Duration = Duration::seconds(60);

	/// Creates a guard over `exchange` using [`Self::DEFAULT_BUFFER`].
	pub fn new(exchange: TokenExchange) -> Self {
		Self { exchange, buffer: Self::DEFAULT_BUFFER, singleflight: AsyncMutex::new(()) }
	}

	/// Overrides the refresh buffer; negative values are clamped to zero.
	pub fn with_buffer(mut self, buffer: Duration) -> Self {
		self.buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Effective refresh buffer.
	pub fn buffer(&self) -> Duration {
		self.buffer
	}

	/// Underlying exchange.
	pub fn exchange(&self) -> &TokenExchange {
		&self.exchange
	}

	/// Exchange counters.
	pub fn metrics(&self) -> &ExchangeMetrics {
		self.exchange.metrics()
	}

	/// Store backing the guard.
	pub fn store(&self) -> &Arc<dyn TokenStore> {
		self.exchange.store()
	}

	/// Returns a token that stays valid for longer than the refresh buffer.
	///
	/// A stored token whose expiry is more than the buffer away is returned without network I/O.
	/// Otherwise exactly one exchange runs and its result is returned. Exchange failures propagate
	/// and leave the stored record unchanged.
	pub async fn valid_token(&self) -> Result<TokenSecret> {
		if let Some(token) = self.fresh_token(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		let _singleflight = self.singleflight.lock().await;

		if let Some(token) = self.fresh_token(OffsetDateTime::now_utc()) {
			return Ok(token);
		}

		self.exchange.exchange().await
	}

	/// Exchanges credentials unconditionally, ignoring the cached expiry.
	///
	/// Used after the target service rejected a token, which proves the cached one unusable no
	/// matter what its expiry claims.
	pub async fn refresh(&self) -> Result<TokenSecret> {
		let _singleflight = self.singleflight.lock().await;

		self.exchange.exchange().await
	}

	fn fresh_token(&self, now: OffsetDateTime) -> Option<TokenSecret> {
		self.store()
			.load()
			.filter(|record| !record.needs_refresh_at(now, self.buffer))
			.map(|record| record.access_token)
	}
}
