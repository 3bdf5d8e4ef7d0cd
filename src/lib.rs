//! Async git-annex special remote plumbing for cloud transfer services: renewing authorizers, a
//! 401-aware REST client, and paged result cursors in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod authorizer;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod paging;
pub mod remote;
pub mod services;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and test doubles; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use reqwest::header::HeaderMap;
	// self
	use crate::{
		auth::TokenResponse,
		authorizer::{CredentialSource, SourceFuture, TokenState},
		clock::Clock,
		error::NetworkError,
		http::{HttpClient, HttpTransport, TransportFuture, TransportRequest, TransportResponse},
		remote::AnnexHost,
	};

	/// Clock whose instant only moves when a test advances it.
	#[derive(Debug)]
	pub struct ManualClock(Mutex<OffsetDateTime>);
	impl ManualClock {
		/// Creates a clock frozen at `now`.
		pub fn new(now: OffsetDateTime) -> Arc<Self> {
			Arc::new(Self(Mutex::new(now)))
		}

		/// Moves the clock forward by `by`.
		pub fn advance(&self, by: Duration) {
			*self.0.lock() += by;
		}

		/// Pins the clock to `at`.
		pub fn set(&self, at: OffsetDateTime) {
			*self.0.lock() = at;
		}
	}
	impl Clock for ManualClock {
		fn now(&self) -> OffsetDateTime {
			*self.0.lock()
		}
	}

	/// Canned reply returned by [`ScriptedTransport`].
	pub enum ScriptedReply {
		/// HTTP response with status, content type, and body.
		Http(u16, &'static str, String),
		/// Transport failure.
		Fail(fn() -> NetworkError),
	}
	impl ScriptedReply {
		/// JSON response helper.
		pub fn json(status: u16, body: serde_json::Value) -> Self {
			Self::Http(status, "application/json", body.to_string())
		}
	}

	/// Transport that replays queued replies and records every request it receives.
	#[derive(Default)]
	pub struct ScriptedTransport {
		replies: Mutex<VecDeque<ScriptedReply>>,
		requests: Mutex<Vec<TransportRequest>>,
	}
	impl ScriptedTransport {
		/// Builds a transport that will answer with `replies` in order.
		pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Arc<Self> {
			Arc::new(Self {
				replies: Mutex::new(replies.into_iter().collect()),
				requests: Mutex::default(),
			})
		}

		/// Requests observed so far.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.requests.lock().clone()
		}

		/// `Authorization` header of every observed request.
		pub fn authorization_headers(&self) -> Vec<Option<String>> {
			self.requests
				.lock()
				.iter()
				.map(|r| {
					r.headers
						.get(reqwest::header::AUTHORIZATION)
						.and_then(|v| v.to_str().ok())
						.map(str::to_owned)
				})
				.collect()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
			Box::pin(async move {
				self.requests.lock().push(request);

				let reply = self.replies.lock().pop_front();

				match reply {
					Some(ScriptedReply::Http(status, content_type, body)) => {
						let mut headers = HeaderMap::new();

						headers.insert(
							reqwest::header::CONTENT_TYPE,
							content_type.parse().expect("Scripted content type should be valid."),
						);

						Ok(TransportResponse { status, headers, body: body.into_bytes() })
					},
					Some(ScriptedReply::Fail(make)) => Err(make()),
					None => panic!("Scripted transport ran out of replies."),
				}
			})
		}
	}

	/// Credential source that hands out `T1`, `T2`, ... and counts its invocations.
	#[derive(Debug, Default)]
	pub struct CountingSource {
		/// Number of completed fetches.
		pub calls: Mutex<u32>,
		/// Lifetime reported for every issued token.
		pub expires_in: i64,
		/// Refresh token attached to issued responses.
		pub rotate_refresh: Option<String>,
		/// Extra resource servers added to every response.
		pub extra_resource_servers: Vec<String>,
	}
	impl CountingSource {
		/// Source issuing tokens that live `expires_in` seconds.
		pub fn new(expires_in: i64) -> Self {
			Self { expires_in, ..Default::default() }
		}

		/// Number of completed fetches.
		pub fn calls(&self) -> u32 {
			*self.calls.lock()
		}
	}
	impl CredentialSource for CountingSource {
		fn kind(&self) -> crate::authorizer::AuthorizerKind {
			crate::authorizer::AuthorizerKind::RefreshToken
		}

		fn fetch<'a>(&'a self, _: &'a TokenState) -> SourceFuture<'a> {
			Box::pin(async move {
				let call = {
					let mut calls = self.calls.lock();

					*calls += 1;

					*calls
				};
				let mut body = serde_json::json!({
					"resource_server": "transfer.api.globus.org",
					"access_token": format!("T{call}"),
					"expires_in": self.expires_in,
					"scope": "urn:globus:auth:scope:transfer.api.globus.org:all",
				});

				if let Some(refresh) = &self.rotate_refresh {
					body["refresh_token"] = refresh.clone().into();
				}

				body["other_tokens"] = self
					.extra_resource_servers
					.iter()
					.map(|rs| {
						serde_json::json!({
							"resource_server": rs,
							"access_token": format!("{rs}-{call}"),
							"expires_in": self.expires_in,
						})
					})
					.collect();

				TokenResponse::from_json(body)
			})
		}
	}

	/// Annex host with fixed settings, a constant hash directory, and a log of info messages.
	#[derive(Debug, Default)]
	pub struct RecordingHost {
		config: Mutex<HashMap<String, String>>,
		messages: Mutex<Vec<String>>,
	}
	impl RecordingHost {
		/// Host answering `getconfig` from `config`.
		pub fn new<'a>(config: impl IntoIterator<Item = (&'a str, &'a str)>) -> Arc<Self> {
			let config = config.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();

			Arc::new(Self { config: Mutex::new(config), messages: Mutex::default() })
		}

		/// Changes a setting.
		pub fn set_config(&self, name: &str, value: &str) {
			self.config.lock().insert(name.to_owned(), value.to_owned());
		}

		/// Info messages received so far.
		pub fn messages(&self) -> Vec<String> {
			self.messages.lock().clone()
		}
	}
	impl AnnexHost for RecordingHost {
		fn getconfig(&self, name: &str) -> Option<String> {
			self.config.lock().get(name).cloned()
		}

		fn dirhash(&self, _: &str) -> String {
			"f87/4d5/".into()
		}

		fn info(&self, message: &str) {
			self.messages.lock().push(message.to_owned());
		}
	}

	/// Builds an [`HttpClient`] rooted at `https://api.test/v0.10/` on top of `transport`.
	pub fn scripted_client(transport: Arc<ScriptedTransport>) -> HttpClient {
		HttpClient::builder(
			Url::parse("https://api.test/v0.10/").expect("Scripted base URL should parse."),
		)
		.transport(transport)
		.build()
		.expect("Scripted HTTP client should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tempfile as _};
