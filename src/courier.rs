//! Execution engine coordinating encoding, transport, classification, and auth recovery.

pub mod execute;
pub mod upload;

pub use execute::ExecuteOptions;
pub use upload::UploadResponse;

// self
use crate::{_prelude::*, auth::AccessTokenStrategy, http::Transport, store::TokenStore};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestTransport, pinning::PinningValidator};

#[cfg(feature = "reqwest")]
/// Courier specialized for the crate's default reqwest transport.
pub type ReqwestCourier = Courier<ReqwestTransport>;

/// Engine-wide defaults applied when an endpoint or a call leaves a knob unset.
#[derive(Clone, Debug)]
pub struct CourierConfig {
	/// Storing-label strategy used when the endpoint declares none.
	pub default_token_strategy: AccessTokenStrategy,
	/// Statuses classified as success.
	pub expected_statuses: HashSet<u16>,
	/// Statuses classified as authentication failures eligible for refresh.
	pub auth_statuses: HashSet<u16>,
}
impl Default for CourierConfig {
	fn default() -> Self {
		Self {
			default_token_strategy: AccessTokenStrategy::default(),
			expected_statuses: [200, 201, 204].into(),
			auth_statuses: [401].into(),
		}
	}
}

/// Monotonic refresh bookkeeping for one endpoint identity.
///
/// The epoch increments once per completed credential rotation. A caller that
/// observed epoch `n` before its request and finds the slot still at `n` after an
/// auth failure performs the refresh itself; any other caller arriving under the
/// same lock sees a newer epoch and reuses the rotated credential instead.
#[derive(Debug, Default)]
pub(crate) struct RefreshSlot {
	pub(crate) epoch: u64,
}

/// Executes declarative endpoints over an injected transport and token store.
///
/// The courier owns the transport, the credential store, and the per-identity
/// refresh ledger, so endpoint values stay plain data. One courier is intended to
/// be shared across an application; all operations take `&self`.
///
/// Refresh slots stay resident for the courier's lifetime, so the ledger's memory
/// footprint is bounded by the set of endpoint identities the application calls.
pub struct Courier<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Credential store consulted for authenticated endpoints.
	pub store: Arc<dyn TokenStore>,
	/// Engine-wide classification and storage defaults.
	pub config: CourierConfig,
	refresh_slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<RefreshSlot>>>>>,
}
impl<T> Courier<T>
where
	T: ?Sized + Transport,
{
	/// Creates a courier over the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn TokenStore>,
		transport: impl Into<Arc<T>>,
		config: CourierConfig,
	) -> Self {
		Self { transport: transport.into(), store, config, refresh_slots: Default::default() }
	}

	/// Returns (and creates on demand) the refresh slot for an endpoint identity.
	///
	/// Slots stay resident for the courier's lifetime; the universe of identities
	/// is bounded by the application's endpoint surface.
	pub(crate) fn refresh_slot(&self, identity: &str) -> Arc<AsyncMutex<RefreshSlot>> {
		let mut slots = self.refresh_slots.lock();

		slots
			.entry(identity.to_owned())
			.or_insert_with(|| Arc::new(AsyncMutex::new(RefreshSlot::default())))
			.clone()
	}
}
#[cfg(feature = "reqwest")]
impl Courier<ReqwestTransport> {
	/// Creates a courier with default configuration over a plain reqwest transport.
	pub fn new(store: Arc<dyn TokenStore>) -> Self {
		Self::with_transport(store, ReqwestTransport::default(), CourierConfig::default())
	}

	/// Creates a courier whose TLS handshakes run through the pinning validator.
	pub fn pinned(store: Arc<dyn TokenStore>, validator: Arc<PinningValidator>) -> Result<Self> {
		Ok(Self::with_transport(
			store,
			ReqwestTransport::pinned(validator)?,
			CourierConfig::default(),
		))
	}
}
impl<T> Clone for Courier<T>
where
	T: ?Sized + Transport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			config: self.config.clone(),
			refresh_slots: self.refresh_slots.clone(),
		}
	}
}
impl<T> Debug for Courier<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Courier").field("config", &self.config).finish_non_exhaustive()
	}
}
