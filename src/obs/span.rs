// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};

/// Span wrapping one logical request, retries included.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	span: Span,
}
impl RequestSpan {
	/// Creates a span tagged with the request method and path.
	pub fn new(method: &reqwest::Method, path: &str) -> Self {
		Self {
			span: tracing::info_span!(
				"annex_remote_globus.request",
				method = method.as_str(),
				path,
				status = tracing::field::Empty
			),
		}
	}

	/// Records the final status on the span.
	pub fn record_status(&self, status: u16) {
		self.span.record("status", status);
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}
