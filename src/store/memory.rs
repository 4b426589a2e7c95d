//! Thread-safe in-memory [`TokenStore`] implementation.

// self
use crate::{_prelude::*, auth::TokenRecord, store::TokenStore};

/// Process-local store backed by a single lock-protected slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<TokenRecord>>>);
impl MemoryStore {
	/// Creates a store pre-populated with `record`.
	pub fn with_record(record: TokenRecord) -> Self {
		Self(Arc::new(RwLock::new(Some(record))))
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> Option<TokenRecord> {
		self.0.read().clone()
	}

	fn save(&self, record: TokenRecord) {
		*self.0.write() = Some(record);
	}

	fn clear(&self) {
		self.0.write().take();
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn record(token: &str) -> TokenRecord {
		TokenRecord::issued(token, OffsetDateTime::now_utc(), Duration::hours(1))
	}

	#[test]
	fn starts_empty_and_replaces_whole_record() {
		let store = MemoryStore::default();

		assert!(store.load().is_none());

		store.save(record("first"));
		store.save(record("second"));

		let current = store.load().expect("Saved record should be readable.");

		assert_eq!(current.access_token.expose(), "second");
	}

	#[test]
	fn clones_share_the_same_slot() {
		let store = MemoryStore::with_record(record("shared"));
		let other = store.clone();

		other.clear();

		assert!(store.load().is_none());
	}
}
