//! Credential persistence contracts and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::AccessToken};

/// Box-pinned future returned by token store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Pluggable credential persistence keyed by storing label.
///
/// The engine is agnostic to the backend: the in-memory store serves tests and
/// short-lived processes while the file store (or a caller-provided secure
/// backend) persists credentials across restarts. Values are stored as
/// JSON-serialized [`AccessToken`]s under the resolved storing label.
pub trait TokenStore: Send + Sync {
	/// Persists or replaces the credential stored under `label`.
	fn store<'a>(&'a self, token: &'a AccessToken, label: &'a str) -> StoreFuture<'a, ()>;

	/// Fetches the credential stored under `label`, if present.
	fn fetch<'a>(&'a self, label: &'a str) -> StoreFuture<'a, Option<AccessToken>>;

	/// Deletes the credential stored under `label`, reporting whether one existed.
	fn delete<'a>(&'a self, label: &'a str) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failure surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure of the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
