//! Courier-level error taxonomy shared across encoding, transport, and execution.
//!
//! Every variant keeps enough structured context (status, headers, raw body) for
//! programmatic branching; nothing collapses to an opaque string.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error type used on transport and refresh seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical courier error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The descriptor could not be turned into a wire request. Terminal immediately,
	/// never subject to the generic retry budget.
	#[error(transparent)]
	BuildRequest(#[from] BuildError),
	/// Local configuration problem (transport construction, pin verifier setup).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport-level failure (DNS, TCP, TLS, lost connection).
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// Storage-layer failure while persisting or resolving credentials.
	#[error("{0}")]
	Storage(#[from] crate::store::StoreError),

	/// Server answered with a status outside both the expected and auth sets.
	#[error("Server returned unexpected status {}.", details.status)]
	UnexpectedResponse {
		/// Status, headers, and raw body of the offending response.
		details: ResponseDetails,
	},
	/// Auth retry exhausted or unavailable; the endpoint stays unauthenticated.
	#[error("Authentication failed with status {}.", details.status)]
	AuthenticationFailed {
		/// Status, headers, and raw body of the final auth failure.
		details: ResponseDetails,
	},
	/// The caller-supplied refresh operation failed; recovery is surfaced, not swallowed.
	#[error("Credential refresh operation failed.")]
	RefreshFailed {
		/// Error produced by the refresh operation.
		#[source]
		source: BoxError,
	},
	/// The body arrived but could not be decoded into the requested type. Never
	/// auto-retried inside a single pipeline pass.
	#[error("Failed to decode the response body.")]
	MapResponseFailed {
		/// Raw body bytes kept for the caller to inspect or re-decode.
		raw: Vec<u8>,
		/// Structured decoding failure with the JSON path that broke.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Expected status with a zero-length body.
	#[error("Server returned an expected status with an empty body.")]
	EmptyResponse,
}
impl Error {
	/// Returns `true` when the error may be retried by the whole-pipeline budget.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Error::Network(_) | Error::UnexpectedResponse { .. } | Error::MapResponseFailed { .. }
		)
	}
}

/// Structured response context carried by status-shaped failures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseDetails {
	/// HTTP status code of the response.
	pub status: u16,
	/// Response headers as received.
	pub headers: BTreeMap<String, String>,
	/// Raw response body bytes.
	pub body: Vec<u8>,
}

/// Failures raised while encoding a descriptor into a wire request.
#[derive(Debug, ThisError)]
pub enum BuildError {
	/// Base URL or joined path failed to parse.
	#[error("Endpoint URL failed to parse.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Body value could not be serialized to JSON.
	#[error("Endpoint body failed to serialize.")]
	BodySerialization {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// A model passed to a map-shaped body variant did not serialize to an object.
	#[error("Body model must serialize to a JSON object.")]
	NonObjectModel,
}

/// Configuration and construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The WebPKI verifier backing pinning deferrals could not be built.
	#[error("System trust verifier could not be constructed.")]
	SystemVerifierBuild {
		/// Underlying verifier builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Connectivity classification applied to transport failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityKind {
	/// The underlying error indicates no connection or a lost connection.
	NoConnectivity,
	/// Any other transport-level failure.
	Other,
}

/// Transport-level network failure with its connectivity classification.
#[derive(Debug, ThisError)]
#[error("Network failure ({kind:?}) while calling the endpoint.")]
pub struct NetworkError {
	/// Whether the failure looks like missing connectivity.
	pub kind: ConnectivityKind,
	/// Transport-specific error.
	#[source]
	pub source: BoxError,
}
impl NetworkError {
	/// Wraps a transport error under the given classification.
	pub fn new(kind: ConnectivityKind, src: impl 'static + Send + Sync + StdError) -> Self {
		Self { kind, source: Box::new(src) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retryable_covers_network_unexpected_and_decode() {
		let network = Error::Network(NetworkError::new(
			ConnectivityKind::Other,
			std::io::Error::other("boom"),
		));
		let unexpected = Error::UnexpectedResponse { details: ResponseDetails::default() };

		assert!(network.is_retryable());
		assert!(unexpected.is_retryable());
		assert!(!Error::EmptyResponse.is_retryable());
		assert!(
			!Error::AuthenticationFailed { details: ResponseDetails::default() }.is_retryable()
		);
	}

	#[test]
	fn network_error_exposes_its_source() {
		let err = Error::Network(NetworkError::new(
			ConnectivityKind::NoConnectivity,
			std::io::Error::other("connection lost"),
		));
		let source =
			StdError::source(&err).expect("Network error should expose the transport failure.");

		assert_eq!(source.to_string(), "connection lost");
	}
}
