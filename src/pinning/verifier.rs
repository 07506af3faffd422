//! rustls adapter running the pinning validator inside the TLS handshake.

// crates.io
use rustls::{
	DigitallySignedStruct, RootCertStore, SignatureScheme,
	client::{
		WebPkiServerVerifier,
		danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
	},
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
// self
use crate::{_prelude::*, error::ConfigError, pinning::{PinningValidator, TrustDecision}};

/// Certificate verifier that consults the pinning validator first and defers to
/// standard WebPKI trust (native roots) when pinning does not apply.
///
/// A [`TrustDecision::Reject`] surfaces as a certificate error, which aborts the
/// handshake with no fallback to plaintext or unpinned trust.
pub struct PinnedServerVerifier {
	validator: Arc<PinningValidator>,
	system: Arc<WebPkiServerVerifier>,
}
impl PinnedServerVerifier {
	/// Builds the verifier, loading native roots for the system-trust path.
	///
	/// Individual root certificates that fail to load are skipped.
	pub fn new(validator: Arc<PinningValidator>) -> Result<Self, ConfigError> {
		let mut roots = RootCertStore::empty();

		for cert in rustls_native_certs::load_native_certs().certs {
			let _ = roots.add(cert);
		}

		Self::with_roots(validator, roots)
	}

	pub(crate) fn with_roots(
		validator: Arc<PinningValidator>,
		roots: RootCertStore,
	) -> Result<Self, ConfigError> {
		let system = WebPkiServerVerifier::builder(Arc::new(roots))
			.build()
			.map_err(|e| ConfigError::SystemVerifierBuild { source: Box::new(e) })?;

		Ok(Self { validator, system })
	}
}
impl ServerCertVerifier for PinnedServerVerifier {
	fn verify_server_cert(
		&self,
		end_entity: &CertificateDer<'_>,
		intermediates: &[CertificateDer<'_>],
		server_name: &ServerName<'_>,
		ocsp_response: &[u8],
		now: UnixTime,
	) -> Result<ServerCertVerified, rustls::Error> {
		let hostname = match server_name {
			ServerName::DnsName(dns) => dns.as_ref().to_owned(),
			ServerName::IpAddress(ip) => std::net::IpAddr::from(*ip).to_string(),
			_ => String::new(),
		};
		let mut chain: Vec<&[u8]> = Vec::with_capacity(1 + intermediates.len());

		chain.push(end_entity.as_ref());
		chain.extend(intermediates.iter().map(|cert| cert.as_ref()));

		match self.validator.evaluate(&hostname, &chain) {
			TrustDecision::Accept => Ok(ServerCertVerified::assertion()),
			TrustDecision::DeferToSystem => self.system.verify_server_cert(
				end_entity,
				intermediates,
				server_name,
				ocsp_response,
				now,
			),
			TrustDecision::Reject => Err(rustls::Error::InvalidCertificate(
				rustls::CertificateError::ApplicationVerificationFailure,
			)),
		}
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		self.system.verify_tls12_signature(message, cert, dss)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		self.system.verify_tls13_signature(message, cert, dss)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.system.supported_verify_schemes()
	}
}
impl Debug for PinnedServerVerifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PinnedServerVerifier").field("validator", &self.validator).finish()
	}
}
