//! Explicit client configuration resolved from an environment-style key/value lookup.
//!
//! Recognized keys:
//!
//! - `GLOBUS_SDK_ENVIRONMENT` selects the service URL table (`default` when unset; `production` is
//!   an alias of `default`).
//! - `GLOBUS_SDK_HTTP_TIMEOUT` is the per-request timeout in seconds; `-1` disables it.
//! - `GLOBUS_SDK_SSL_VERIFY` toggles TLS certificate verification.
//! - `GLOBUS_SDK_SERVICE_URL_<SERVICE>` overrides a service base URL.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

const ENVIRONMENT_KEY: &str = "GLOBUS_SDK_ENVIRONMENT";
const HTTP_TIMEOUT_KEY: &str = "GLOBUS_SDK_HTTP_TIMEOUT";
const SSL_VERIFY_KEY: &str = "GLOBUS_SDK_SSL_VERIFY";
const SERVICE_URL_PREFIX: &str = "GLOBUS_SDK_SERVICE_URL_";

/// Services reachable through this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Service {
	/// OAuth2 authorization service.
	Auth,
	/// File transfer service.
	Transfer,
}
impl Service {
	/// Returns a stable label suitable for configuration keys and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Service::Auth => "auth",
			Service::Transfer => "transfer",
		}
	}

	fn builtin_url(self, environment: &str) -> Option<&'static str> {
		match (self, environment) {
			(Service::Auth, "default") => Some("https://auth.globus.org/"),
			(Service::Transfer, "default") => Some("https://transfer.api.globusonline.org/v0.10/"),
			(Service::Auth, "preview") => Some("https://auth.preview.globus.org/"),
			(Service::Transfer, "preview") =>
				Some("https://transfer.api.preview.globus.org/v0.10/"),
			(Service::Auth, "sandbox") => Some("https://auth.sandbox.globuscs.info/"),
			(Service::Transfer, "sandbox") =>
				Some("https://transfer.api.sandbox.globuscs.info/v0.10/"),
			_ => None,
		}
	}
}
impl Display for Service {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Resolved configuration passed explicitly to every client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Environment name selecting the built-in URL table.
	pub environment: String,
	/// Per-request timeout; `None` disables it.
	pub http_timeout: Option<StdDuration>,
	/// Whether TLS certificates are verified.
	pub verify_tls: bool,
	/// Per-service base URL overrides.
	pub service_urls: BTreeMap<Service, Url>,
}
impl ClientConfig {
	/// Timeout applied when none is configured.
	pub const DEFAULT_HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(60);
	/// Environment used when none is configured.
	pub const DEFAULT_ENVIRONMENT: &'static str = "default";

	/// Resolves configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Resolves configuration from an arbitrary key/value lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let environment = match lookup(ENVIRONMENT_KEY).map(|v| v.trim().to_owned()) {
			None => Self::DEFAULT_ENVIRONMENT.to_owned(),
			Some(v) if v.is_empty() || v == "production" => Self::DEFAULT_ENVIRONMENT.to_owned(),
			Some(v) => v,
		};
		let http_timeout = match lookup(HTTP_TIMEOUT_KEY) {
			Some(raw) => parse_timeout(HTTP_TIMEOUT_KEY, &raw)?,
			None => Some(Self::DEFAULT_HTTP_TIMEOUT),
		};
		let verify_tls = match lookup(SSL_VERIFY_KEY) {
			Some(raw) => parse_bool(SSL_VERIFY_KEY, &raw)?,
			None => true,
		};
		let mut service_urls = BTreeMap::new();

		for service in [Service::Auth, Service::Transfer] {
			let key = format!("{SERVICE_URL_PREFIX}{}", service.as_str().to_ascii_uppercase());

			if let Some(raw) = lookup(&key) {
				service_urls.insert(service, parse_url(&raw)?);
			}
		}

		tracing::debug!(%environment, ?http_timeout, verify_tls, "Resolved client configuration.");

		Ok(Self { environment, http_timeout, verify_tls, service_urls })
	}

	/// Overrides the environment.
	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = environment.into();

		self
	}

	/// Overrides the HTTP timeout.
	pub fn with_http_timeout(mut self, timeout: Option<StdDuration>) -> Self {
		self.http_timeout = timeout;

		self
	}

	/// Overrides TLS verification.
	pub fn with_verify_tls(mut self, verify: bool) -> Self {
		self.verify_tls = verify;

		self
	}

	/// Overrides the base URL of `service`.
	pub fn with_service_url(mut self, service: Service, url: Url) -> Self {
		self.service_urls.insert(service, url);

		self
	}

	/// Base URL of `service`: the override when present, else the environment's built-in URL.
	pub fn service_url(&self, service: Service) -> Result<Url, ConfigError> {
		if let Some(url) = self.service_urls.get(&service) {
			return Ok(url.clone());
		}

		let environment =
			if self.environment == "production" { "default" } else { self.environment.as_str() };

		service.builtin_url(environment).map(parse_url).unwrap_or_else(|| {
			Err(ConfigError::UnknownService {
				service: service.as_str(),
				environment: self.environment.clone(),
			})
		})
	}

	/// Builds a reqwest client honoring the TLS and timeout settings.
	pub fn reqwest_client(&self) -> Result<ReqwestClient, ConfigError> {
		let mut builder = ReqwestClient::builder()
			.danger_accept_invalid_certs(!self.verify_tls)
			.redirect(reqwest::redirect::Policy::none());

		if let Some(timeout) = self.http_timeout {
			builder = builder.connect_timeout(timeout);
		}

		Ok(builder.build()?)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			environment: Self::DEFAULT_ENVIRONMENT.to_owned(),
			http_timeout: Some(Self::DEFAULT_HTTP_TIMEOUT),
			verify_tls: true,
			service_urls: BTreeMap::new(),
		}
	}
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "yes" | "true" | "on" => Ok(true),
		"0" | "no" | "false" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidBool { key: key.to_owned(), value: raw.to_owned() }),
	}
}

fn parse_timeout(key: &str, raw: &str) -> Result<Option<StdDuration>, ConfigError> {
	let invalid = || ConfigError::InvalidTimeout { key: key.to_owned(), value: raw.to_owned() };
	let seconds = raw.trim().parse::<f64>().map_err(|_| invalid())?;

	if seconds == -1.0 {
		return Ok(None);
	}

	StdDuration::try_from_secs_f64(seconds).map(Some).map_err(|_| invalid())
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	// Relative paths are joined onto the base, so it must end in a slash.
	let normalized = if raw.ends_with('/') { raw.to_owned() } else { format!("{raw}/") };

	Url::parse(&normalized)
		.map_err(|source| ConfigError::InvalidUrl { value: raw.to_owned(), source })
}
