//! Optional observability helpers for request phases.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rest_courier.request` with the `phase`
//!   (execute/upload/refresh) and `identity` (endpoint) fields.
//! - Enable `metrics` to increment the `rest_courier_request_total` counter for every
//!   attempt/success/failure, labeled by `phase` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Request phases observed by the courier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
	/// Single request/response execution.
	Execute,
	/// Progress-reporting upload.
	Upload,
	/// Credential refresh triggered by an authentication failure.
	Refresh,
}
impl PhaseKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			PhaseKind::Execute => "execute",
			PhaseKind::Upload => "upload",
			PhaseKind::Refresh => "refresh",
		}
	}
}
impl Display for PhaseKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a courier operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
