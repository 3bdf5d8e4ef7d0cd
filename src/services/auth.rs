//! OAuth2 grant endpoints of the auth service.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, ScopeSet, TokenResponse, TokenSecret},
	authorizer::{Authorizer, AuthorizerKind, NullAuthorizer, StaticAuthorizer},
	config::{ClientConfig, Service},
	error::UsageError,
	http::{HttpClient, HttpClientBuilder, RequestOptions, Response, TextBody},
};

const TOKEN_PATH: &str = "/v2/oauth2/token";
const REVOKE_PATH: &str = "/v2/oauth2/token/revoke";

/// How the client authenticates itself to the token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthClientKind {
	/// Public client; identifies itself with `client_id` in the form.
	Native,
	/// Confidential client; authenticates with basic credentials.
	Confidential,
}
impl AuthClientKind {
	const fn allowed(self) -> &'static [AuthorizerKind] {
		match self {
			AuthClientKind::Native => &[AuthorizerKind::Null],
			AuthClientKind::Confidential => &[AuthorizerKind::Basic],
		}
	}
}

/// Client for the auth service's grant endpoints.
#[derive(Clone, Debug)]
pub struct AuthClient {
	http: HttpClient,
	client_id: ClientId,
	kind: AuthClientKind,
}
impl AuthClient {
	/// Public client using the configured auth service.
	pub fn native(config: &ClientConfig, client_id: ClientId) -> Result<Self> {
		let builder = HttpClient::builder_for(config, Service::Auth)?;

		Self::native_with(builder, client_id)
	}

	/// Public client on top of a prepared HTTP client builder.
	pub fn native_with(builder: HttpClientBuilder, client_id: ClientId) -> Result<Self> {
		Self::with_authorizer(builder, client_id, AuthClientKind::Native, Arc::new(NullAuthorizer))
	}

	/// Confidential client using the configured auth service.
	pub fn confidential(
		config: &ClientConfig,
		client_id: ClientId,
		secret: TokenSecret,
	) -> Result<Self> {
		let builder = HttpClient::builder_for(config, Service::Auth)?;

		Self::confidential_with(builder, client_id, secret)
	}

	/// Confidential client on top of a prepared HTTP client builder.
	pub fn confidential_with(
		builder: HttpClientBuilder,
		client_id: ClientId,
		secret: TokenSecret,
	) -> Result<Self> {
		let authorizer = StaticAuthorizer::basic(&client_id, &secret)?;

		Self::with_authorizer(builder, client_id, AuthClientKind::Confidential, Arc::new(authorizer))
	}

	fn with_authorizer(
		builder: HttpClientBuilder,
		client_id: ClientId,
		kind: AuthClientKind,
		authorizer: Arc<dyn Authorizer>,
	) -> Result<Self> {
		let http =
			builder.authorizer(authorizer).allowed_authorizers("AuthClient", kind.allowed()).build()?;

		Ok(Self { http, client_id, kind })
	}

	/// Client identifier.
	pub fn client_id(&self) -> &ClientId {
		&self.client_id
	}

	/// Authentication mode.
	pub fn kind(&self) -> AuthClientKind {
		self.kind
	}

	/// Underlying HTTP client.
	pub fn http(&self) -> &HttpClient {
		&self.http
	}

	/// POSTs `form` to the token endpoint and parses the grant response.
	pub async fn oauth2_token(&self, form: Vec<(String, String)>) -> Result<TokenResponse> {
		let mut form = form;

		if self.kind == AuthClientKind::Native && !form.iter().any(|(k, _)| k == "client_id") {
			form.push(("client_id".into(), self.client_id.to_string()));
		}

		let grant_type =
			form.iter().find(|(k, _)| k == "grant_type").map(|(_, v)| v.clone()).unwrap_or_default();

		tracing::debug!(client_id = %self.client_id, %grant_type, "Requesting tokens.");

		let response = self.http.post_text(TOKEN_PATH, TextBody::Form(form), RequestOptions::new()).await?;

		TokenResponse::from_json(response.into_json(TOKEN_PATH)?)
	}

	/// Exchanges a refresh token for new tokens.
	pub async fn oauth2_refresh_token(&self, refresh_token: &TokenSecret) -> Result<TokenResponse> {
		tracing::info!(
			refresh_token_fingerprint = %refresh_token.fingerprint(),
			"Executing refresh token grant."
		);

		self.oauth2_token(vec![
			("refresh_token".into(), refresh_token.expose().to_owned()),
			("grant_type".into(), "refresh_token".into()),
		])
		.await
	}

	/// Requests tokens for `scopes` with the client-credentials grant.
	pub async fn oauth2_client_credentials_tokens(&self, scopes: &ScopeSet) -> Result<TokenResponse> {
		if self.kind != AuthClientKind::Confidential {
			return Err(UsageError::Unsupported {
				operation: "The client credentials grant",
				requirement: "a confidential client",
			}
			.into());
		}

		tracing::info!(scopes = %scopes, "Fetching tokens with the client credentials grant.");

		self.oauth2_token(vec![
			("grant_type".into(), "client_credentials".into()),
			("scope".into(), scopes.normalized()),
		])
		.await
	}

	/// Revokes an access or refresh token.
	pub async fn oauth2_revoke_token(&self, token: &TokenSecret) -> Result<Response> {
		tracing::info!(token_fingerprint = %token.fingerprint(), "Revoking token.");

		let mut form = vec![("token".to_owned(), token.expose().to_owned())];

		if self.kind == AuthClientKind::Native {
			form.push(("client_id".into(), self.client_id.to_string()));
		}

		self.http.post_text(REVOKE_PATH, TextBody::Form(form), RequestOptions::new()).await
	}
}
