//! REST client implementing the request protocol shared by every service client.

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::{
	Method,
	header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
// self
use crate::{
	_prelude::*,
	authorizer::{Authorizer, AuthorizerKind},
	config::{ClientConfig, Service},
	error::{ApiError, UsageError},
	http::{
		HttpTransport, ReqwestTransport, RequestOptions, Response, TextBody, TransportRequest,
		TransportResponse, slash_join,
	},
	obs::{self, RequestOutcome, RequestSpan},
};

const USER_AGENT_PREFIX: &str = concat!("annex-remote-globus/", env!("CARGO_PKG_VERSION"));

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
	base_url: Url,
	transport: Option<Arc<dyn HttpTransport>>,
	authorizer: Option<Arc<dyn Authorizer>>,
	allowed: Option<(&'static str, &'static [AuthorizerKind])>,
	timeout: Option<StdDuration>,
	app_name: Option<String>,
}
impl HttpClientBuilder {
	/// Sets the transport; defaults to a reqwest transport with default settings.
	pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
		self.transport = Some(transport);

		self
	}

	/// Sets the authorizer consulted before every send.
	pub fn authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
		self.authorizer = Some(authorizer);

		self
	}

	/// Sets an optional authorizer.
	pub fn maybe_authorizer(mut self, authorizer: Option<Arc<dyn Authorizer>>) -> Self {
		self.authorizer = authorizer;

		self
	}

	/// Restricts the authorizer kinds the client accepts.
	pub fn allowed_authorizers(
		mut self,
		client: &'static str,
		kinds: &'static [AuthorizerKind],
	) -> Self {
		self.allowed = Some((client, kinds));

		self
	}

	/// Sets the default per-request timeout.
	pub fn timeout(mut self, timeout: Option<StdDuration>) -> Self {
		self.timeout = timeout;

		self
	}

	/// Appends an application name to the User-Agent.
	pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
		self.app_name = Some(app_name.into());

		self
	}

	/// Validates the authorizer and builds the client.
	pub fn build(self) -> Result<HttpClient> {
		if let (Some((client, kinds)), Some(authorizer)) = (self.allowed, &self.authorizer) {
			authorizer.kind().ensure_allowed(client, kinds)?;
		}

		let mut headers = HeaderMap::new();

		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
		headers.insert(USER_AGENT, user_agent(self.app_name.as_deref())?);

		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(ReqwestTransport::new()?),
		};

		Ok(HttpClient {
			inner: Arc::new(Inner {
				base_url: self.base_url,
				default_headers: RwLock::new(headers),
				transport,
				authorizer: self.authorizer,
				timeout: self.timeout,
			}),
		})
	}
}

struct Inner {
	base_url: Url,
	default_headers: RwLock<HeaderMap>,
	transport: Arc<dyn HttpTransport>,
	authorizer: Option<Arc<dyn Authorizer>>,
	timeout: Option<StdDuration>,
}

/// REST client bound to one service base URL.
///
/// Clones share the transport, default headers, and authorizer.
#[derive(Clone)]
pub struct HttpClient {
	inner: Arc<Inner>,
}
impl HttpClient {
	/// Starts a builder for `base_url`.
	pub fn builder(base_url: Url) -> HttpClientBuilder {
		HttpClientBuilder {
			base_url,
			transport: None,
			authorizer: None,
			allowed: None,
			timeout: Some(ClientConfig::DEFAULT_HTTP_TIMEOUT),
			app_name: None,
		}
	}

	/// Starts a builder for `service` using the configured URL, timeout, and TLS settings.
	pub fn builder_for(config: &ClientConfig, service: Service) -> Result<HttpClientBuilder> {
		let transport = ReqwestTransport::with_client(config.reqwest_client()?);

		Ok(Self::builder(config.service_url(service)?)
			.transport(Arc::new(transport))
			.timeout(config.http_timeout))
	}

	/// Base URL requests are resolved against.
	pub fn base_url(&self) -> &Url {
		&self.inner.base_url
	}

	/// Configured authorizer.
	pub fn authorizer(&self) -> Option<&Arc<dyn Authorizer>> {
		self.inner.authorizer.as_ref()
	}

	/// Replaces the application name carried in the User-Agent.
	pub fn set_app_name(&self, app_name: &str) -> Result<()> {
		let value = user_agent(Some(app_name))?;

		self.inner.default_headers.write().insert(USER_AGENT, value);

		Ok(())
	}

	/// Sends a GET request.
	pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response> {
		self.request(Method::GET, path, options).await
	}

	/// Sends a POST request with a JSON body.
	pub async fn post(&self, path: &str, json: Value, options: RequestOptions) -> Result<Response> {
		self.request(Method::POST, path, options.json(json)).await
	}

	/// Sends a POST request with a text body.
	pub async fn post_text(
		&self,
		path: &str,
		text: TextBody,
		options: RequestOptions,
	) -> Result<Response> {
		self.request(Method::POST, path, options.text(text)).await
	}

	/// Sends a PUT request; the body comes from `options`.
	pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Response> {
		self.request(Method::PUT, path, options).await
	}

	/// Sends a PATCH request; the body comes from `options`.
	pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Response> {
		self.request(Method::PATCH, path, options).await
	}

	/// Sends a DELETE request.
	pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response> {
		self.request(Method::DELETE, path, options).await
	}

	/// Sends one logical request.
	///
	/// The authorizer decorates the headers before the first send. A 401 with
	/// [`RequestOptions::retry_on_401`] set asks the authorizer whether it can recover and, when
	/// it can, re-decorates and resends exactly once. Statuses in `[200, 400)` become a
	/// [`Response`]; anything else becomes an [`ApiError`].
	pub async fn request(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
	) -> Result<Response> {
		let span = RequestSpan::new(&method, path);

		span.instrument(self.request_inner(method, path, options, &span)).await
	}

	async fn request_inner(
		&self,
		method: Method,
		path: &str,
		options: RequestOptions,
		span: &RequestSpan,
	) -> Result<Response> {
		let mut headers = self.inner.default_headers.read().clone();

		for (name, value) in &options.headers {
			headers.insert(name, value.clone());
		}

		let body = options.encode_body(&mut headers)?;
		let url = self.resolve(path, &options)?;
		let timeout = options.timeout.or(self.inner.timeout);
		let authorizer = self.inner.authorizer.as_deref();

		if let Some(authorizer) = authorizer {
			authorizer.decorate(&mut headers).await?;
		}

		tracing::debug!(%url, "Sending request.");

		let mut response = self.send(&method, &url, &headers, &body, timeout).await?;
		let mut outcome = RequestOutcome::Success;

		if let Some(authorizer) = authorizer.filter(|_| response.status == 401 && options.retry_on_401)
		{
			let recovered = authorizer.recover_from_auth_failure().await;

			if recovered {
				tracing::info!(%url, "Retrying request after re-authorizing.");

				authorizer.decorate(&mut headers).await?;
				response = self.send(&method, &url, &headers, &body, timeout).await?;
				outcome = RequestOutcome::Retried;
			}
		}

		let TransportResponse { status, headers: response_headers, body: raw } = response;

		span.record_status(status);

		if (200..400).contains(&status) {
			obs::record_request_outcome(&method, outcome);
			tracing::debug!(status, "Request succeeded.");

			return Ok(Response::new(method, url, status, response_headers, raw));
		}

		let content_type = response_headers
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok());
		let error = ApiError::from_response(status, content_type, &raw);

		obs::record_request_outcome(&method, RequestOutcome::ApiError);
		tracing::debug!(status, code = %error.code, "Request failed.");

		Err(error.into())
	}

	async fn send(
		&self,
		method: &Method,
		url: &Url,
		headers: &HeaderMap,
		body: &Option<Vec<u8>>,
		timeout: Option<StdDuration>,
	) -> Result<TransportResponse> {
		let request = TransportRequest {
			method: method.clone(),
			url: url.clone(),
			headers: headers.clone(),
			body: body.clone(),
			timeout,
		};

		match self.inner.transport.send(request).await {
			Ok(response) => Ok(response),
			Err(e) => {
				obs::record_request_outcome(method, RequestOutcome::NetworkError);
				tracing::warn!(%url, error = %e, "Request failed before a response arrived.");

				Err(e.into())
			},
		}
	}

	fn resolve(&self, path: &str, options: &RequestOptions) -> Result<Url> {
		let joined = slash_join(self.inner.base_url.as_str(), path);
		let mut url = Url::parse(&joined).map_err(|e| UsageError::InvalidRequest {
			reason: format!("{joined:?} is not a valid URL: {e}"),
		})?;

		options.params.apply_to(&mut url);

		Ok(url)
	}
}
impl Debug for HttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpClient")
			.field("base_url", &self.inner.base_url.as_str())
			.field("authorizer", &self.inner.authorizer.as_ref().map(|a| a.kind()))
			.field("timeout", &self.inner.timeout)
			.finish()
	}
}

fn user_agent(app_name: Option<&str>) -> Result<HeaderValue> {
	let value = match app_name {
		Some(app_name) => format!("{USER_AGENT_PREFIX}/{app_name}"),
		None => USER_AGENT_PREFIX.to_owned(),
	};

	HeaderValue::from_str(&value).map_err(|_| {
		UsageError::InvalidRequest { reason: format!("{value:?} is not a valid User-Agent") }
			.into()
	})
}
