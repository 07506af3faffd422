//! TLS certificate and public-key pinning evaluated mid-handshake.
//!
//! [`PinningValidator`] is a pure trust-evaluation hook over DER chains; the
//! [`PinnedServerVerifier`] adapter wires it into a rustls handshake and defers to
//! standard WebPKI trust whenever pinning does not apply.

pub mod verifier;

pub use verifier::PinnedServerVerifier;

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Which pinning checks run during trust evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PinningMode {
	/// Require the leaf certificate DER to be a member of the pinned certificate set.
	pub check_certificate: bool,
	/// Require the leaf SPKI public key to be a member of the pinned key set.
	pub check_public_key: bool,
}
impl PinningMode {
	/// No pinning; every host defers to standard system trust.
	pub const OFF: Self = Self { check_certificate: false, check_public_key: false };
	/// Certificate pinning only.
	pub const CERTIFICATE: Self = Self { check_certificate: true, check_public_key: false };
	/// Public-key pinning only.
	pub const PUBLIC_KEY: Self = Self { check_certificate: false, check_public_key: true };

	/// Returns `true` when no check is enabled.
	pub const fn is_off(self) -> bool {
		!self.check_certificate && !self.check_public_key
	}
}
impl std::ops::BitOr for PinningMode {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self {
			check_certificate: self.check_certificate || rhs.check_certificate,
			check_public_key: self.check_public_key || rhs.check_public_key,
		}
	}
}

/// Pinned trust anchors stored as SHA-256 digests of certificate DER and SPKI DER.
///
/// Loaded once and cached for the validator's lifetime. Pins that fail to parse
/// for key extraction are skipped rather than failing the whole set.
#[derive(Clone, Debug, Default)]
pub struct PinSet {
	certificates: HashSet<[u8; 32]>,
	public_keys: HashSet<[u8; 32]>,
}
impl PinSet {
	/// Builds a set from DER certificates, extracting a key pin from each one.
	pub fn from_der_certificates(certificates: impl IntoIterator<Item = Vec<u8>>) -> Self {
		let mut pins = Self::default();

		for der in certificates {
			pins.insert_certificate(&der);
		}

		pins
	}

	/// Adds a certificate pin and, when the DER parses, the matching key pin.
	pub fn insert_certificate(&mut self, der: &[u8]) {
		self.certificates.insert(sha256(der));

		if let Some(spki) = extract_spki(der) {
			self.public_keys.insert(sha256(&spki));
		}
	}

	/// Adds a bare SPKI public-key pin.
	pub fn insert_public_key(&mut self, spki_der: &[u8]) {
		self.public_keys.insert(sha256(spki_der));
	}

	/// Returns `true` when neither set holds a pin.
	pub fn is_empty(&self) -> bool {
		self.certificates.is_empty() && self.public_keys.is_empty()
	}

	fn contains_certificate(&self, der: &[u8]) -> bool {
		self.certificates.contains(&sha256(der))
	}

	fn contains_public_key(&self, spki_der: &[u8]) -> bool {
		self.public_keys.contains(&sha256(spki_der))
	}
}

/// Outcome of a trust evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrustDecision {
	/// Pins matched; the transport may proceed with the presented chain.
	Accept,
	/// Pinning does not apply here; standard system trust evaluation still runs.
	DeferToSystem,
	/// The chain failed pinning; the handshake must be aborted with no fallback.
	Reject,
}

/// Synchronous trust-evaluation hook invoked by the transport mid-handshake.
///
/// Constructed once and injected into the transport; no process-wide state.
#[derive(Clone, Debug)]
pub struct PinningValidator {
	mode: PinningMode,
	pins: PinSet,
	excluded_hosts: HashSet<String>,
}
impl PinningValidator {
	/// Creates a validator over the given mode, pin set, and excluded hosts.
	pub fn new(
		mode: PinningMode,
		pins: PinSet,
		excluded_hosts: impl IntoIterator<Item = String>,
	) -> Self {
		Self { mode, pins, excluded_hosts: excluded_hosts.into_iter().collect() }
	}

	/// Evaluates the presented chain (leaf first) for the given hostname.
	///
	/// Excluded hosts and disabled pinning defer to system trust; they are never a
	/// blanket accept of a bad chain. A missing or unreadable leaf fails closed.
	pub fn evaluate(&self, hostname: &str, chain: &[impl AsRef<[u8]>]) -> TrustDecision {
		if self.excluded_hosts.contains(hostname) {
			return TrustDecision::DeferToSystem;
		}
		if self.mode.is_off() {
			return TrustDecision::DeferToSystem;
		}

		let Some(leaf) = chain.first().map(AsRef::as_ref) else {
			return TrustDecision::Reject;
		};

		if leaf.is_empty() {
			return TrustDecision::Reject;
		}
		if self.mode.check_certificate && !self.pins.contains_certificate(leaf) {
			return TrustDecision::Reject;
		}
		if self.mode.check_public_key {
			let Some(spki) = extract_spki(leaf) else {
				return TrustDecision::Reject;
			};

			if !self.pins.contains_public_key(&spki) {
				return TrustDecision::Reject;
			}
		}

		TrustDecision::Accept
	}
}

/// Extracts the SPKI DER bytes from a certificate under a basic X.509 parse.
fn extract_spki(der: &[u8]) -> Option<Vec<u8>> {
	x509_parser::parse_x509_certificate(der).ok().map(|(_, cert)| cert.public_key().raw.to_vec())
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
	Sha256::digest(bytes).into()
}
