//! Thread-safe in-memory [`TokenStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	store::{StoreError, StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<String, AccessToken>>>;

/// Keeps credentials in-process; nothing survives a restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	fn store_now(map: StoreMap, token: AccessToken, label: String) -> Result<(), StoreError> {
		map.write().insert(label, token);

		Ok(())
	}

	fn fetch_now(map: StoreMap, label: &str) -> Option<AccessToken> {
		map.read().get(label).cloned()
	}

	fn delete_now(map: StoreMap, label: &str) -> bool {
		map.write().remove(label).is_some()
	}
}
impl TokenStore for MemoryStore {
	fn store<'a>(&'a self, token: &'a AccessToken, label: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let token = token.clone();
		let label = label.to_owned();

		Box::pin(async move { Self::store_now(map, token, label) })
	}

	fn fetch<'a>(&'a self, label: &'a str) -> StoreFuture<'a, Option<AccessToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::fetch_now(map, label)) })
	}

	fn delete<'a>(&'a self, label: &'a str) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::delete_now(map, label)) })
	}
}
