//! Declarative REST courier—describe an endpoint once, then execute it with single-flight
//! token refresh, structured error classification, and TLS certificate/key pinning.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod courier;
pub mod encode;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod obs;
pub mod pinning;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests built on the default
	//! reqwest transport; enabled via `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		courier::{Courier, CourierConfig},
		http::ReqwestTransport,
		store::{MemoryStore, TokenStore},
	};

	/// Courier type alias used by reqwest-backed integration tests.
	pub type ReqwestTestCourier = Courier<ReqwestTransport>;

	/// Constructs a [`Courier`] backed by an in-memory store and a plain reqwest
	/// transport, returning the store so tests can inspect persisted credentials.
	pub fn build_reqwest_test_courier() -> (ReqwestTestCourier, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let courier =
			Courier::with_transport(store, ReqwestTransport::default(), CourierConfig::default());

		(courier, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use futures_util::{Stream, StreamExt};
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{BoxError, Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
#[cfg(test)] use rest_courier as _;
