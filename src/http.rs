//! HTTP request protocol and transport primitives.
//!
//! [`HttpClient`] implements the request protocol (header merging, body encoding, authorization,
//! a single retry on 401, error classification). It talks to the network only through
//! [`HttpTransport`], so tests and alternative stacks can swap the transport without touching the
//! protocol. [`ReqwestTransport`] is the production implementation.

pub mod client;
pub mod request;
pub mod response;

pub use client::*;
pub use request::*;
pub use response::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{Method, header::HeaderMap, redirect::Policy};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, NetworkError},
};

/// Bytes escaped inside a path part; unreserved characters and `/` stay literal.
const PATH_PART: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~').remove(b'/');

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, NetworkError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one fully prepared request.
///
/// Implementations perform exactly one network exchange per call: no redirects, retries, or
/// status interpretation. Failures that produced no HTTP response are reported as
/// [`NetworkError`]; any response, whatever its status, is returned as-is.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and collects the full response body.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Fully prepared request handed to a transport.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Final header set.
	pub headers: HeaderMap,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
	/// Whole-request timeout.
	pub timeout: Option<StdDuration>,
}

/// Raw response produced by a transport.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Full response body.
	pub body: Vec<u8>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Redirects should stay disabled on custom clients; [`ReqwestTransport::new`] and
/// [`crate::config::ClientConfig`] build clients that way.
#[derive(Clone, Debug)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Transport over a stock client that never follows redirects.
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().redirect(Policy::none()).build()?))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let TransportRequest { method, url, headers, body, timeout } = request;
			let mut builder = self.0.request(method, url.clone()).headers(headers);

			if let Some(body) = body {
				builder = builder.body(body);
			}
			if let Some(timeout) = timeout {
				builder = builder.timeout(timeout);
			}

			let response =
				builder.send().await.map_err(|e| NetworkError::from_reqwest(&url, e))?;
			let status = response.status().as_u16();
			let headers = response.headers().to_owned();
			let body = response
				.bytes()
				.await
				.map_err(|e| NetworkError::from_reqwest(&url, e))?
				.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

/// Returns true for `application/json` and `+json` media types.
pub fn is_json_content_type(content_type: &str) -> bool {
	let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();

	essence == "application/json" || essence.ends_with("+json")
}

/// Joins `base` and `path` with exactly one slash between them.
pub fn slash_join(base: &str, path: &str) -> String {
	match (base.ends_with('/'), path.starts_with('/')) {
		(true, true) => format!("{base}{}", &path[1..]),
		(false, false) if !path.is_empty() => format!("{base}/{path}"),
		_ => format!("{base}{path}"),
	}
}

/// Builds an absolute path from `parts`, percent-encoding each one.
///
/// Slashes inside a part are kept.
pub fn qjoin_path<I, S>(parts: I) -> String
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	parts.into_iter().fold(String::new(), |mut path, part| {
		path.push('/');
		path.extend(utf8_percent_encode(part.as_ref(), PATH_PART));

		path
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn slash_join_uses_exactly_one_slash() {
		assert_eq!(slash_join("https://a.test/v1/", "/task"), "https://a.test/v1/task");
		assert_eq!(slash_join("https://a.test/v1", "task"), "https://a.test/v1/task");
		assert_eq!(slash_join("https://a.test/v1/", "task"), "https://a.test/v1/task");
		assert_eq!(slash_join("https://a.test/v1", "/task"), "https://a.test/v1/task");
		assert_eq!(slash_join("https://a.test/v1/", ""), "https://a.test/v1/");
	}

	#[test]
	fn qjoin_path_quotes_segments() {
		assert_eq!(qjoin_path(["endpoint", "go#ep1", "ls"]), "/endpoint/go%23ep1/ls");
		assert_eq!(qjoin_path(["task", "a b"]), "/task/a%20b");
		assert_eq!(qjoin_path(["~me", "dir/sub", "x?y&z"]), "/~me/dir/sub/x%3Fy%26z");
		assert_eq!(qjoin_path(["data", "café ☃"]), "/data/caf%C3%A9%20%E2%98%83");
	}

	#[test]
	fn json_content_types_are_sniffed() {
		assert!(is_json_content_type("application/json"));
		assert!(is_json_content_type("Application/JSON; charset=utf-8"));
		assert!(is_json_content_type("application/problem+json"));
		assert!(!is_json_content_type("text/plain"));
	}
}
