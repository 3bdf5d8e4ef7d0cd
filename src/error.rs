//! Crate-wide error taxonomy shared by the HTTP client, authorizers, pagers, and remotes.
//!
//! Every failure surfaces as a variant of [`Error`]. Transport failures never leak the underlying
//! HTTP stack's error type; they are classified into [`NetworkError`] first.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The request never produced an HTTP response.
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// The service answered with a status outside `[200, 400)`.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// An authorizer failed to obtain a usable access token.
	#[error(transparent)]
	TokenRenewal(#[from] TokenRenewalError),
	/// The caller combined options that cannot be honored.
	#[error(transparent)]
	Usage(#[from] UsageError),
	/// Configuration could not be resolved.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A successful response lacked the structure the caller relies on.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
}
impl Error {
	/// HTTP status attached to API errors.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(e) => Some(e.status),
			_ => None,
		}
	}

	/// Returns true when the error is an API error with the given status.
	pub fn is_status(&self, status: u16) -> bool {
		self.status() == Some(status)
	}
}

/// Failures raised before any HTTP response was received.
#[derive(Debug, ThisError)]
pub enum NetworkError {
	/// The connection could not be established before the timeout elapsed.
	///
	/// Nothing reached the server, so the request may be resent safely.
	#[error("Connection to {url} timed out.")]
	ConnectionTimeout {
		/// Target URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The request timed out after the connection was established.
	#[error("Request to {url} timed out.")]
	Timeout {
		/// Target URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The connection failed (DNS, TCP, TLS).
	#[error("Connection to {url} failed.")]
	Connection {
		/// Target URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Any other transport failure.
	#[error("Network error occurred while calling {url}.")]
	Other {
		/// Target URL.
		url: String,
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl NetworkError {
	/// Classifies a reqwest failure.
	pub fn from_reqwest(url: &Url, e: ReqwestError) -> Self {
		let url = url.to_string();
		let (connect, timeout) = (e.is_connect(), e.is_timeout());
		let source = Box::new(e);

		match (connect, timeout) {
			(true, true) => Self::ConnectionTimeout { url, source },
			(false, true) => Self::Timeout { url, source },
			(true, false) => Self::Connection { url, source },
			(false, false) => Self::Other { url, source },
		}
	}

	/// Returns true for both timeout flavors.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. } | Self::ConnectionTimeout { .. })
	}

	/// Returns true when the server cannot have seen the request.
	pub fn is_retry_safe(&self) -> bool {
		matches!(self, Self::ConnectionTimeout { .. })
	}

	/// URL of the failed request.
	pub fn url(&self) -> &str {
		match self {
			Self::ConnectionTimeout { url, .. }
			| Self::Timeout { url, .. }
			| Self::Connection { url, .. }
			| Self::Other { url, .. } => url,
		}
	}
}

/// Structured error returned by the service for statuses outside `[200, 400)`.
#[derive(Clone, Debug, ThisError)]
#[error("API error {status} ({code}): {message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Service error code, `Error` when none could be extracted.
	pub code: String,
	/// Service error message, the raw body when none could be extracted.
	pub message: String,
	/// Service-specific fields of the error document (e.g. `request_id`, `error_data`).
	pub extra: BTreeMap<String, Value>,
	/// Raw response body.
	pub raw_text: String,
}
impl ApiError {
	/// Code used when the body carries no structured error.
	pub const FALLBACK_CODE: &'static str = "Error";

	/// Parses an error response body.
	///
	/// JSON bodies are read only when `content_type` says so. A body of the form
	/// `{"errors": [...]}` contributes its first element. The error document must carry `code`
	/// and one of `message` or `detail`; anything else falls back to the raw text.
	pub fn from_response(status: u16, content_type: Option<&str>, body: &[u8]) -> Self {
		let raw_text = String::from_utf8_lossy(body).into_owned();
		let parsed = content_type
			.filter(|ct| crate::http::is_json_content_type(ct))
			.and_then(|_| serde_json::from_slice::<Value>(body).ok())
			.and_then(|v| Self::extract(status, v));

		match parsed {
			Some((code, message, extra)) => Self { status, code, message, extra, raw_text },
			None => Self {
				status,
				code: Self::FALLBACK_CODE.into(),
				message: raw_text.clone(),
				extra: BTreeMap::new(),
				raw_text,
			},
		}
	}

	/// Value of the `request_id` field, when the service supplied one.
	pub fn request_id(&self) -> Option<&str> {
		self.extra.get("request_id").and_then(Value::as_str)
	}

	fn extract(status: u16, body: Value) -> Option<(String, String, BTreeMap<String, Value>)> {
		let Value::Object(mut document) = body else { return None };

		if let Some(Value::Array(errors)) = document.remove("errors") {
			if errors.len() != 1 {
				tracing::warn!(
					status,
					count = errors.len(),
					"Error document carries multiple errors; using the first one."
				);
			}

			let Some(Value::Object(first)) = errors.into_iter().next() else { return None };

			document = first;
		}

		let code = document.remove("code").and_then(value_to_string)?;
		let message = match document.remove("message").and_then(value_to_string) {
			Some(message) => message,
			None => document.remove("detail").and_then(value_to_string)?,
		};

		document.remove("detail");

		Some((code, message, document.into_iter().collect()))
	}
}

fn value_to_string(value: Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s),
		Value::Null => None,
		other => Some(other.to_string()),
	}
}

/// Failures raised while obtaining a fresh access token.
#[derive(Debug, ThisError)]
pub enum TokenRenewalError {
	/// The grant response did not resolve to exactly one resource server.
	#[error("Token response resolved to {found} resource servers ({resource_servers:?}); expected exactly one.")]
	AmbiguousToken {
		/// Number of resource servers found.
		found: usize,
		/// Resource server names found.
		resource_servers: Vec<String>,
	},
	/// No refresh token is available for a refresh grant.
	#[error("No refresh token is available for renewal.")]
	MissingRefreshToken,
	/// The token endpoint returned a body that is not a token response.
	#[error("Token endpoint returned a malformed token response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The declared token lifetime cannot be represented as an expiry instant.
	#[error("Token lifetime of {expires_in} seconds does not yield a representable expiry.")]
	InvalidExpiry {
		/// Declared lifetime in seconds.
		expires_in: i64,
	},
	/// The grant request itself failed.
	#[error("Token grant request failed.")]
	Grant {
		/// Underlying request failure.
		#[source]
		source: Box<Error>,
	},
}
impl TokenRenewalError {
	/// Wraps a request failure, keeping renewal errors as they are.
	pub fn grant(e: Error) -> Error {
		match e {
			Error::TokenRenewal(_) => e,
			other => Self::Grant { source: Box::new(other) }.into(),
		}
	}
}

/// Misuse of the public API.
#[derive(Debug, ThisError)]
pub enum UsageError {
	/// Both a JSON body and a text body were supplied.
	#[error("Only one of a JSON body or a text body may be supplied.")]
	ConflictingBodies,
	/// The client does not accept the supplied authorizer.
	#[error("{client} does not accept {authorizer} authorizers.")]
	IncompatibleAuthorizer {
		/// Client name.
		client: &'static str,
		/// Rejected authorizer kind.
		authorizer: &'static str,
	},
	/// An operation requires a capability the client was not built with.
	#[error("{operation} requires {requirement}.")]
	Unsupported {
		/// Operation name.
		operation: &'static str,
		/// Missing capability.
		requirement: &'static str,
	},
	/// The request could not be assembled.
	#[error("Request could not be constructed: {reason}.")]
	InvalidRequest {
		/// What went wrong.
		reason: String,
	},
	/// A transfer document was built without items.
	#[error("A transfer requires at least one item.")]
	EmptyTransfer,
}

/// A successful response lacked a field the caller relies on.
#[derive(Debug, ThisError)]
#[error("Response from {context} is malformed: {reason}.")]
pub struct MalformedResponseError {
	/// Operation that received the response.
	pub context: String,
	/// What was missing or mistyped.
	pub reason: String,
}
impl MalformedResponseError {
	/// Creates a new malformed-response error.
	pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
		Self { context: context.into(), reason: reason.into() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A boolean setting holds an unrecognized value.
	#[error("Value {value:?} for {key} is not a boolean.")]
	InvalidBool {
		/// Setting name.
		key: String,
		/// Raw value.
		value: String,
	},
	/// The HTTP timeout is neither a number of seconds nor `-1`.
	#[error("Value {value:?} for {key} is not a timeout in seconds.")]
	InvalidTimeout {
		/// Setting name.
		key: String,
		/// Raw value.
		value: String,
	},
	/// No URL is known for the service in the selected environment.
	#[error("No {service} URL is known for environment `{environment}`.")]
	UnknownService {
		/// Service name.
		service: &'static str,
		/// Environment name.
		environment: String,
	},
	/// A configured URL does not parse.
	#[error("URL {value:?} is invalid.")]
	InvalidUrl {
		/// Raw value.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const JSON: Option<&str> = Some("application/json; charset=utf-8");

	#[test]
	fn single_error_document_is_extracted() {
		let body = br#"{"code":"NotFound","message":"No such task","request_id":"abc123"}"#;
		let error = ApiError::from_response(404, JSON, body);

		assert_eq!(error.code, "NotFound");
		assert_eq!(error.message, "No such task");
		assert_eq!(error.request_id(), Some("abc123"));
		assert!(!error.extra.contains_key("code"));
	}

	#[test]
	fn error_list_uses_first_entry_and_detail_fallback() {
		let body = br#"{"errors":[{"code":"BadRequest","detail":"oops"},{"code":"Other","message":"x"}]}"#;
		let error = ApiError::from_response(400, JSON, body);

		assert_eq!(error.code, "BadRequest");
		assert_eq!(error.message, "oops");
		assert_eq!(error.status, 400);
	}

	#[test]
	fn unusable_bodies_fall_back_to_raw_text() {
		let error = ApiError::from_response(502, Some("text/html"), b"<html>Bad gateway</html>");

		assert_eq!(error.code, ApiError::FALLBACK_CODE);
		assert_eq!(error.message, "<html>Bad gateway</html>");

		let error = ApiError::from_response(500, JSON, b"{not json");

		assert_eq!(error.code, ApiError::FALLBACK_CODE);
		assert_eq!(error.message, "{not json");

		let error = ApiError::from_response(403, JSON, br#"{"message":"no code here"}"#);

		assert_eq!(error.code, ApiError::FALLBACK_CODE);
		assert_eq!(error.raw_text, r#"{"message":"no code here"}"#);

		let error = ApiError::from_response(400, JSON, br#"{"errors":[]}"#);

		assert_eq!(error.code, ApiError::FALLBACK_CODE);
	}

	#[test]
	fn renewal_wrapping_keeps_renewal_errors() {
		let wrapped = TokenRenewalError::grant(TokenRenewalError::MissingRefreshToken.into());

		assert!(matches!(wrapped, Error::TokenRenewal(TokenRenewalError::MissingRefreshToken)));

		let wrapped = TokenRenewalError::grant(UsageError::ConflictingBodies.into());

		assert!(matches!(wrapped, Error::TokenRenewal(TokenRenewalError::Grant { .. })));
	}
}
