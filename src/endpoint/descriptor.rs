//! Concrete, immutable endpoint descriptor with builder-style construction.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::AccessTokenStrategy,
	endpoint::{BodyVariant, Boundary, Endpoint, Method, RefreshOperation},
};

/// Canonical [`Endpoint`] implementation assembled per call.
///
/// Descriptors are cheap to clone and immutable once built; the refresh hook is
/// shared behind an `Arc` so cloning a descriptor never duplicates refresh state.
#[derive(Clone)]
pub struct EndpointDescriptor {
	base_url: String,
	path: String,
	method: Method,
	headers: BTreeMap<String, String>,
	body: BodyVariant,
	boundary: Option<Boundary>,
	requires_auth: bool,
	token_strategy: Option<AccessTokenStrategy>,
	identity: Option<String>,
	refresh: Option<Arc<dyn RefreshOperation>>,
}
impl EndpointDescriptor {
	/// Creates a descriptor for the given target with no headers, no body, and no auth.
	pub fn new(base_url: impl Into<String>, path: impl Into<String>, method: Method) -> Self {
		Self {
			base_url: base_url.into(),
			path: path.into(),
			method,
			headers: BTreeMap::new(),
			body: BodyVariant::None,
			boundary: None,
			requires_auth: false,
			token_strategy: None,
			identity: None,
			refresh: None,
		}
	}

	/// Adds or replaces a caller header.
	pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(key.into(), value.into());

		self
	}

	/// Replaces the whole caller header map.
	pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
		self.headers = headers;

		self
	}

	/// Sets the body variant.
	pub fn with_body(mut self, body: BodyVariant) -> Self {
		self.body = body;

		self
	}

	/// Convenience setter for a pre-serialized JSON model body.
	pub fn with_json_model(mut self, value: Value) -> Self {
		self.body = BodyVariant::JsonModel(value);

		self
	}

	/// Wraps the computed body payload with a multipart boundary.
	pub fn with_boundary(mut self, boundary: Boundary) -> Self {
		self.boundary = Some(boundary);

		self
	}

	/// Marks the endpoint as requiring an `Authorization` header.
	pub fn with_auth(mut self) -> Self {
		self.requires_auth = true;

		self
	}

	/// Overrides the storing-label strategy for this endpoint.
	pub fn with_token_strategy(mut self, strategy: AccessTokenStrategy) -> Self {
		self.token_strategy = Some(strategy);

		self
	}

	/// Overrides the identity string used for retry bookkeeping.
	pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
		self.identity = Some(identity.into());

		self
	}

	/// Attaches the credential refresh hook invoked after an auth failure.
	pub fn with_refresh_operation(mut self, refresh: Arc<dyn RefreshOperation>) -> Self {
		self.refresh = Some(refresh);

		self
	}
}
impl Endpoint for EndpointDescriptor {
	fn base_url(&self) -> &str {
		&self.base_url
	}

	fn path(&self) -> &str {
		&self.path
	}

	fn method(&self) -> Method {
		self.method
	}

	fn headers(&self) -> BTreeMap<String, String> {
		self.headers.clone()
	}

	fn body(&self) -> BodyVariant {
		self.body.clone()
	}

	fn boundary(&self) -> Option<&Boundary> {
		self.boundary.as_ref()
	}

	fn requires_auth(&self) -> bool {
		self.requires_auth
	}

	fn token_strategy(&self) -> Option<&AccessTokenStrategy> {
		self.token_strategy.as_ref()
	}

	fn refresh_operation(&self) -> Option<&dyn RefreshOperation> {
		self.refresh.as_deref()
	}

	fn identity(&self) -> String {
		match &self.identity {
			Some(identity) => identity.clone(),
			None => {
				let base = self.base_url.trim_end_matches('/');
				let path = self.path.trim_start_matches('/');

				if path.is_empty() {
					format!("{} {base}", self.method.as_str())
				} else {
					format!("{} {base}/{path}", self.method.as_str())
				}
			},
		}
	}
}
impl Debug for EndpointDescriptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EndpointDescriptor")
			.field("base_url", &self.base_url)
			.field("path", &self.path)
			.field("method", &self.method)
			.field("requires_auth", &self.requires_auth)
			.field("identity", &self.identity)
			.field("refresh_set", &self.refresh.is_some())
			.finish()
	}
}
