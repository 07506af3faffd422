//! Declarative endpoint descriptions consumed by the execution engine.

pub mod body;
pub mod descriptor;

pub use body::*;
pub use descriptor::*;

// self
use crate::{_prelude::*, auth::{AccessToken, AccessTokenStrategy}};

/// HTTP request method carried by a descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// GET request.
	Get,
	/// POST request.
	Post,
	/// PUT request.
	Put,
	/// DELETE request.
	Delete,
	/// PATCH request.
	Patch,
	/// HEAD request.
	Head,
	/// OPTIONS request.
	Options,
	/// CONNECT request.
	Connect,
	/// TRACE request.
	Trace,
}
impl Method {
	/// Returns the uppercase wire representation.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
			Method::Patch => "PATCH",
			Method::Head => "HEAD",
			Method::Options => "OPTIONS",
			Method::Connect => "CONNECT",
			Method::Trace => "TRACE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cancellable future returned by [`RefreshOperation::refresh`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<AccessToken, BoxError>> + 'a + Send>>;

/// Caller-supplied credential refresh hook invoked after an auth failure.
///
/// The operation must be idempotent enough to be re-invoked across calls; the
/// courier guarantees at most one in-flight invocation per endpoint identity.
pub trait RefreshOperation: Send + Sync {
	/// Obtains a fresh credential from the authentication backend.
	fn refresh(&self) -> RefreshFuture<'_>;
}

/// Adapter turning an async closure into a [`RefreshOperation`].
pub struct RefreshFn<F>(F);
impl<F> RefreshFn<F> {
	/// Wraps the provided closure.
	pub fn new(f: F) -> Self {
		Self(f)
	}
}
impl<F, Fut> RefreshOperation for RefreshFn<F>
where
	F: Fn() -> Fut + Send + Sync,
	Fut: Future<Output = Result<AccessToken, BoxError>> + Send + 'static,
{
	fn refresh(&self) -> RefreshFuture<'_> {
		Box::pin((self.0)())
	}
}

/// Abstract declaration of one REST call.
///
/// [`EndpointDescriptor`] is the canonical implementation; custom endpoint types
/// implement the trait directly when descriptors are assembled elsewhere. Only
/// `base_url`, `path`, and `method` are required—the remaining hooks default to
/// an unauthenticated, body-less call.
pub trait Endpoint: Send + Sync {
	/// Base URL of the service, e.g. `https://api.example.com`.
	fn base_url(&self) -> &str;

	/// Path appended to the base URL.
	fn path(&self) -> &str;

	/// Request method.
	fn method(&self) -> Method;

	/// Caller headers added before the library `User-Agent`.
	fn headers(&self) -> BTreeMap<String, String> {
		BTreeMap::new()
	}

	/// Body variant encoded into the wire request.
	fn body(&self) -> BodyVariant {
		BodyVariant::None
	}

	/// Optional multipart boundary wrapping the computed payload.
	fn boundary(&self) -> Option<&Boundary> {
		None
	}

	/// Whether an `Authorization: Bearer` header is attached.
	fn requires_auth(&self) -> bool {
		false
	}

	/// Storing-label strategy; `None` falls back to the courier default.
	fn token_strategy(&self) -> Option<&AccessTokenStrategy> {
		None
	}

	/// Refresh hook invoked on auth failure, if the endpoint supports recovery.
	fn refresh_operation(&self) -> Option<&dyn RefreshOperation> {
		None
	}

	/// Identity string used for retry bookkeeping and identity-keyed storage.
	///
	/// Must be deterministic for the same logical endpoint across calls and
	/// process restarts. The default combines method, base URL, and path.
	fn identity(&self) -> String {
		let base = self.base_url().trim_end_matches('/');
		let path = self.path().trim_start_matches('/');

		if path.is_empty() {
			format!("{} {base}", self.method().as_str())
		} else {
			format!("{} {base}/{path}", self.method().as_str())
		}
	}
}
