//! Token State storage contract and the built-in in-memory store.
//!
//! A store holds at most one [`TokenRecord`]. Writes replace the whole record, so readers observe
//! either the previous token with its expiry or the new pair, never a mix. Only the token exchange
//! writes to the store, and only after a successful response.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::auth::TokenRecord;

/// Storage backend holding the current access token.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the current record, if one was ever saved.
	fn load(&self) -> Option<TokenRecord>;

	/// Replaces the current record.
	fn save(&self, record: TokenRecord);

	/// Drops the current record so the next read triggers an exchange.
	fn clear(&self);
}
