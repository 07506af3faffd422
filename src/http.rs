//! Transport primitives bridging the courier to a concrete HTTP stack.
//!
//! The [`Transport`] trait is the crate's only dependency on an HTTP client.
//! Implementations return box-pinned `Send` futures so the courier stays runtime
//! agnostic, and upload implementations publish a progress/terminal event stream
//! the engine classifies exactly like a plain response.

// self
use crate::{
	_prelude::*,
	endpoint::Method,
	error::{NetworkError, ResponseDetails},
};
#[cfg(feature = "reqwest")]
use crate::{error::ConnectivityKind, pinning::{PinnedServerVerifier, PinningValidator}};

/// Encoded request handed to a transport.
#[derive(Clone, Debug)]
pub struct WireRequest {
	/// Request method.
	pub method: Method,
	/// Absolute URL including any query rewrite.
	pub url: Url,
	/// Ordered header list; later entries may repeat earlier names.
	pub headers: Vec<(String, String)>,
	/// Body bytes, if the descriptor produced any.
	pub body: Option<Vec<u8>>,
}

/// Raw response surfaced by a transport before classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WireResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl WireResponse {
	pub(crate) fn into_details(self) -> ResponseDetails {
		ResponseDetails { status: self.status, headers: self.headers, body: self.body }
	}
}

/// Box-pinned future returned by transport operations.
pub type TransportFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, NetworkError>> + 'a + Send>>;

/// Transport-level event emitted during an upload.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportUploadEvent {
	/// Fractional progress in `0.0..=1.0`, non-decreasing. Intermediate events may
	/// be dropped under backpressure.
	Progress(f64),
	/// Exactly one terminal event closing the stream.
	Done(WireResponse),
}

/// Stream of upload events produced by [`Transport::upload`].
pub type UploadEventStream =
	Pin<Box<dyn Stream<Item = Result<TransportUploadEvent, NetworkError>> + Send>>;

/// Abstraction over HTTP stacks capable of sending encoded wire requests.
///
/// Implementations must classify their own failures into [`NetworkError`] so the
/// engine can distinguish missing connectivity from other transport problems.
/// TLS trust evaluation (including pinning) is configured when the transport is
/// built; see [`ReqwestTransport::pinned`] for the default stack.
pub trait Transport: Send + Sync {
	/// Sends the request and collects the full response.
	fn send(&self, request: WireRequest) -> TransportFuture<'_, WireResponse>;

	/// Starts an upload, yielding progress events and one terminal event.
	fn upload(&self, request: WireRequest) -> TransportFuture<'_, UploadEventStream>;
}

/// Default transport backed by [`ReqwestClient`].
///
/// `reqwest` exposes no native upload-progress hook, so [`Transport::upload`]
/// performs the transfer as a single send and emits only the terminal event;
/// transports with richer stacks publish intermediate progress.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a transport whose TLS handshakes run through the pinning validator.
	///
	/// Rejection aborts the handshake; there is no fallback to plaintext or to
	/// unpinned trust.
	pub fn pinned(validator: Arc<PinningValidator>) -> Result<Self> {
		let verifier = PinnedServerVerifier::new(validator)?;
		let tls = rustls::ClientConfig::builder()
			.dangerous()
			.with_custom_certificate_verifier(Arc::new(verifier))
			.with_no_client_auth();
		let client = ReqwestClient::builder()
			.use_preconfigured_tls(tls)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	fn into_reqwest(&self, request: WireRequest) -> reqwest::RequestBuilder {
		let method = match request.method {
			Method::Get => reqwest::Method::GET,
			Method::Post => reqwest::Method::POST,
			Method::Put => reqwest::Method::PUT,
			Method::Delete => reqwest::Method::DELETE,
			Method::Patch => reqwest::Method::PATCH,
			Method::Head => reqwest::Method::HEAD,
			Method::Options => reqwest::Method::OPTIONS,
			Method::Connect => reqwest::Method::CONNECT,
			Method::Trace => reqwest::Method::TRACE,
		};
		let mut builder = self.0.request(method, request.url);

		for (key, value) in request.headers {
			builder = builder.header(key, value);
		}
		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		builder
	}

	async fn send_inner(&self, request: WireRequest) -> Result<WireResponse, NetworkError> {
		let response = self.into_reqwest(request).send().await.map_err(map_reqwest_error)?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(key, value)| {
				value.to_str().ok().map(|text| (key.as_str().to_owned(), text.to_owned()))
			})
			.collect();
		let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();

		Ok(WireResponse { status, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn send(&self, request: WireRequest) -> TransportFuture<'_, WireResponse> {
		Box::pin(self.send_inner(request))
	}

	fn upload(&self, request: WireRequest) -> TransportFuture<'_, UploadEventStream> {
		Box::pin(async move {
			let response = self.send_inner(request).await?;
			let stream: UploadEventStream = Box::pin(futures_util::stream::iter([Ok(
				TransportUploadEvent::Done(response),
			)]));

			Ok(stream)
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(e: ReqwestError) -> NetworkError {
	let kind = if e.is_connect() || e.is_timeout() {
		ConnectivityKind::NoConnectivity
	} else {
		ConnectivityKind::Other
	};

	NetworkError::new(kind, e)
}
