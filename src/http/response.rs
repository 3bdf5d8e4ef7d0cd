//! Successful HTTP responses.

// crates.io
use reqwest::{Method, header::HeaderMap};
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::MalformedResponseError, http::is_json_content_type};

/// Authoritative body representation, chosen by content-type sniffing.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
	/// Body declared as JSON and decoded successfully.
	Json(Value),
	/// Any other body, or a JSON body that failed to decode.
	Text(String),
}

/// Response with a status in `[200, 400)`.
#[derive(Clone, Debug)]
pub struct Response {
	/// HTTP status code.
	pub status: u16,
	/// Declared content type.
	pub content_type: Option<String>,
	/// Response headers.
	pub headers: HeaderMap,
	/// Decoded body.
	pub body: ResponseBody,
	/// Raw body bytes.
	pub raw: Vec<u8>,
	/// Method of the originating request.
	pub method: Method,
	/// URL of the originating request.
	pub url: Url,
}
impl Response {
	pub(crate) fn new(
		method: Method,
		url: Url,
		status: u16,
		headers: HeaderMap,
		raw: Vec<u8>,
	) -> Self {
		let content_type = headers
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.map(str::to_owned);
		let body = match content_type.as_deref().filter(|ct| is_json_content_type(ct)) {
			Some(_) => match serde_json::from_slice(&raw) {
				Ok(value) => ResponseBody::Json(value),
				Err(e) => {
					tracing::warn!(%url, status, error = %e, "Response declared JSON but did not decode.");

					ResponseBody::Text(String::from_utf8_lossy(&raw).into_owned())
				},
			},
			None => ResponseBody::Text(String::from_utf8_lossy(&raw).into_owned()),
		};

		Self { status, content_type, headers, body, raw, method, url }
	}

	/// Decoded JSON body, if the body is JSON.
	pub fn json(&self) -> Option<&Value> {
		match &self.body {
			ResponseBody::Json(value) => Some(value),
			ResponseBody::Text(_) => None,
		}
	}

	/// Body as text regardless of its representation.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.raw).into_owned()
	}

	/// Looks up `key` in a JSON object body.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.json().and_then(|v| v.get(key))
	}

	/// Consumes the response and returns its JSON body.
	pub fn into_json(self, context: &str) -> Result<Value> {
		match self.body {
			ResponseBody::Json(value) => Ok(value),
			ResponseBody::Text(_) =>
				Err(MalformedResponseError::new(context, "body is not JSON").into()),
		}
	}

	/// Deserializes the JSON body into `T`.
	pub fn deserialize<T>(&self, context: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self
			.json()
			.ok_or_else(|| MalformedResponseError::new(context, "body is not JSON"))?;

		T::deserialize(value).map_err(|e| MalformedResponseError::new(context, e.to_string()).into())
	}

	/// Returns true for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}
