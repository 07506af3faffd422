//! Storing-label resolution for persisted credentials.

// self
use crate::_prelude::*;

/// Well-known label under which the shared, courier-wide credential is persisted.
pub const GLOBAL_STORING_LABEL: &str = "rest-courier.global";

/// Picks the storage key used to persist and resolve an endpoint's credential.
///
/// Resolution is deterministic across process restarts: an explicit custom label
/// wins, the global strategy maps to [`GLOBAL_STORING_LABEL`], and the identity
/// strategy falls back to the endpoint's own identity string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTokenStrategy {
	/// One credential shared by every endpoint of the courier.
	#[default]
	Global,
	/// One credential per logical endpoint, keyed by its identity string.
	EndpointIdentity,
	/// Caller-chosen label.
	Custom(String),
}
impl AccessTokenStrategy {
	/// Resolves the storing label for an endpoint with the given identity.
	pub fn storing_label<'a>(&'a self, identity: &'a str) -> &'a str {
		match self {
			AccessTokenStrategy::Global => GLOBAL_STORING_LABEL,
			AccessTokenStrategy::EndpointIdentity => identity,
			AccessTokenStrategy::Custom(label) => label,
		}
	}
}
