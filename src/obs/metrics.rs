// self
use crate::{
	authorizer::AuthorizerKind,
	obs::{RenewalOutcome, RequestOutcome},
};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(method: &reqwest::Method, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"annex_remote_globus_request_total",
			"method" => method.as_str().to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (method, outcome);
	}
}

/// Records a renewal outcome via the global metrics recorder (when enabled).
pub fn record_renewal_outcome(source: AuthorizerKind, outcome: RenewalOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"annex_remote_globus_renewal_total",
			"source" => source.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (source, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_noops_without_a_global_recorder() {
		record_request_outcome(&reqwest::Method::GET, RequestOutcome::Retried);
		record_renewal_outcome(AuthorizerKind::RefreshToken, RenewalOutcome::Failure);
	}
}
