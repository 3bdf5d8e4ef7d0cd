//! Observability helpers for requests and token renewals.
//!
//! - Every request runs inside a span named `annex_remote_globus.request` with `method` and
//!   `path` fields.
//! - Enable `metrics` to increment `annex_remote_globus_request_total` (labeled by `method` +
//!   `outcome`) and `annex_remote_globus_renewal_total` (labeled by `source` + `outcome`).

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Status in `[200, 400)`.
	Success,
	/// 401 answered by a second, re-authorized attempt.
	Retried,
	/// Structured API error.
	ApiError,
	/// No HTTP response was received.
	NetworkError,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Success => "success",
			RequestOutcome::Retried => "retried",
			RequestOutcome::ApiError => "api_error",
			RequestOutcome::NetworkError => "network_error",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each renewal attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenewalOutcome {
	/// Entry to a renewal.
	Attempt,
	/// New token installed.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RenewalOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RenewalOutcome::Attempt => "attempt",
			RenewalOutcome::Success => "success",
			RenewalOutcome::Failure => "failure",
		}
	}
}
impl Display for RenewalOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
