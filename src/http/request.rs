//! Request options accepted by [`crate::http::HttpClient`].

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, error::UsageError};

/// Ordered query parameters; entries whose value is `None` are omitted from the URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, Option<String>)>);
impl QueryParams {
	/// Creates an empty parameter list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces `key`.
	pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.set(key, Some(value.to_string()));

		self
	}

	/// Adds or replaces `key` with an optional value.
	pub fn with_opt(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
		self.set(key, value.map(|v| v.to_string()));

		self
	}

	/// Sets `key`, replacing any previous entry in place.
	pub fn set(&mut self, key: impl Into<String>, value: Option<String>) {
		let key = key.into();

		match self.0.iter_mut().find(|(k, _)| *k == key) {
			Some(entry) => entry.1 = value,
			None => self.0.push((key, value)),
		}
	}

	/// Value of `key`, if present and not absent.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(k, _)| k == key).and_then(|(_, v)| v.as_deref())
	}

	/// Pairs that will be sent.
	pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
	}

	/// Appends the present pairs to `url`'s query string.
	pub fn apply_to(&self, url: &mut Url) {
		let mut pairs = self.present().peekable();

		if pairs.peek().is_none() {
			return;
		}

		url.query_pairs_mut().extend_pairs(pairs);
	}
}
impl<K, V> FromIterator<(K, V)> for QueryParams
where
	K: Into<String>,
	V: ToString,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		iter.into_iter().fold(Self::new(), |params, (k, v)| params.with(k, v))
	}
}

/// Text body forms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextBody {
	/// Raw string sent as-is.
	Raw(String),
	/// Raw bytes sent as-is.
	Bytes(Vec<u8>),
	/// Form fields, URL-encoded with `application/x-www-form-urlencoded`.
	Form(Vec<(String, String)>),
}
impl TextBody {
	/// Builds a form body from key/value pairs.
	pub fn form<I, K, V>(fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

/// Per-request options.
#[derive(Clone, Debug)]
pub struct RequestOptions {
	/// Query parameters.
	pub params: QueryParams,
	/// Headers merged over the client defaults.
	pub headers: HeaderMap,
	/// Structured body, serialized as JSON.
	pub json_body: Option<Value>,
	/// Text body.
	pub text_body: Option<TextBody>,
	/// Timeout override; falls back to the client timeout.
	pub timeout: Option<StdDuration>,
	/// Whether a 401 may trigger one re-authorized retry.
	pub retry_on_401: bool,
}
impl RequestOptions {
	/// Options with no parameters, headers, or body.
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the query parameters.
	pub fn params(mut self, params: QueryParams) -> Self {
		self.params = params;

		self
	}

	/// Adds a header that overrides the client default of the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a JSON body.
	pub fn json(mut self, body: Value) -> Self {
		self.json_body = Some(body);

		self
	}

	/// Sets a text body.
	pub fn text(mut self, body: TextBody) -> Self {
		self.text_body = Some(body);

		self
	}

	/// Overrides the client timeout for this request.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Disables the re-authorized retry on 401.
	pub fn without_401_retry(mut self) -> Self {
		self.retry_on_401 = false;

		self
	}

	/// Encodes the body, setting the matching content type when the caller did not set one.
	pub(crate) fn encode_body(&self, headers: &mut HeaderMap) -> Result<Option<Vec<u8>>> {
		let (body, content_type) = match (&self.json_body, &self.text_body) {
			(Some(_), Some(_)) => return Err(UsageError::ConflictingBodies.into()),
			(None, None) => return Ok(None),
			(Some(json), None) => (
				serde_json::to_vec(json).map_err(|e| UsageError::InvalidRequest {
					reason: format!("JSON body could not be serialized: {e}"),
				})?,
				Some("application/json"),
			),
			(None, Some(TextBody::Raw(text))) => (text.clone().into_bytes(), None),
			(None, Some(TextBody::Bytes(bytes))) => (bytes.clone(), None),
			(None, Some(TextBody::Form(fields))) => (
				url::form_urlencoded::Serializer::new(String::new())
					.extend_pairs(fields)
					.finish()
					.into_bytes(),
				Some("application/x-www-form-urlencoded"),
			),
		};

		if let Some(content_type) = content_type.filter(|_| !headers.contains_key(CONTENT_TYPE)) {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
		}

		Ok(Some(body))
	}
}
impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			params: QueryParams::default(),
			headers: HeaderMap::new(),
			json_body: None,
			text_body: None,
			timeout: None,
			retry_on_401: true,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn absent_params_are_omitted() {
		let params = QueryParams::new()
			.with("limit", 10)
			.with_opt("marker", None::<String>)
			.with("filter", "a b&c");
		let mut url = Url::parse("https://api.test/task_list").expect("Fixture URL should parse.");

		params.apply_to(&mut url);

		assert_eq!(url.query(), Some("limit=10&filter=a+b%26c"));
		assert_eq!(params.get("marker"), None);

		let mut url = Url::parse("https://api.test/x").expect("Fixture URL should parse.");

		QueryParams::new().with_opt("marker", None::<u8>).apply_to(&mut url);

		assert_eq!(url.as_str(), "https://api.test/x");
	}

	#[test]
	fn set_replaces_in_place() {
		let mut params = QueryParams::from_iter([("limit", 5), ("offset", 0)]);

		params.set("limit", Some("2".into()));

		assert_eq!(params.present().collect::<Vec<_>>(), vec![("limit", "2"), ("offset", "0")]);
	}

	#[test]
	fn body_encoding_sets_content_type() {
		let mut headers = HeaderMap::new();
		let body = RequestOptions::new()
			.text(TextBody::form([("grant_type", "refresh_token"), ("refresh_token", "R 1")]))
			.encode_body(&mut headers)
			.expect("Form body should encode.");

		assert_eq!(body.as_deref(), Some(&b"grant_type=refresh_token&refresh_token=R+1"[..]));
		assert_eq!(headers[CONTENT_TYPE], "application/x-www-form-urlencoded");

		let mut headers = HeaderMap::new();
		let body = RequestOptions::new()
			.json(serde_json::json!({"a": 1}))
			.encode_body(&mut headers)
			.expect("JSON body should encode.");

		assert_eq!(body.as_deref(), Some(&b"{\"a\":1}"[..]));
		assert_eq!(headers[CONTENT_TYPE], "application/json");
	}

	#[test]
	fn conflicting_bodies_are_rejected() {
		let err = RequestOptions::new()
			.json(Value::Null)
			.text(TextBody::Raw("x".into()))
			.encode_body(&mut HeaderMap::new())
			.expect_err("Two bodies must be rejected.");

		assert!(matches!(err, Error::Usage(UsageError::ConflictingBodies)));
	}
}
