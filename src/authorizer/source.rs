//! Credential sources that feed renewing authorizers.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenResponse},
	authorizer::{AuthorizerKind, TokenState},
	error::TokenRenewalError,
	services::AuthClient,
};

/// Boxed future returned by [`CredentialSource::fetch`].
pub type SourceFuture<'a> = Pin<Box<dyn Future<Output = Result<TokenResponse>> + 'a + Send>>;

/// Produces a fresh token response given the authorizer's prior state.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Authorizer kind reported by authorizers built on this source.
	fn kind(&self) -> AuthorizerKind;

	/// Performs one grant exchange.
	fn fetch<'a>(&'a self, state: &'a TokenState) -> SourceFuture<'a>;
}

/// Exchanges the stored refresh token for a new access token.
#[derive(Clone, Debug)]
pub struct RefreshTokenSource {
	client: AuthClient,
}
impl RefreshTokenSource {
	/// Creates a source that refreshes through `client`.
	pub fn new(client: AuthClient) -> Self {
		Self { client }
	}
}
impl CredentialSource for RefreshTokenSource {
	fn kind(&self) -> AuthorizerKind {
		AuthorizerKind::RefreshToken
	}

	fn fetch<'a>(&'a self, state: &'a TokenState) -> SourceFuture<'a> {
		Box::pin(async move {
			let refresh_token =
				state.refresh_token.as_ref().ok_or(TokenRenewalError::MissingRefreshToken)?;

			self.client.oauth2_refresh_token(refresh_token).await
		})
	}
}

/// Requests a new access token with the client-credentials grant.
#[derive(Clone, Debug)]
pub struct ClientCredentialsSource {
	client: AuthClient,
	scopes: ScopeSet,
}
impl ClientCredentialsSource {
	/// Creates a source requesting `scopes` through a confidential `client`.
	pub fn new(client: AuthClient, scopes: ScopeSet) -> Self {
		Self { client, scopes }
	}
}
impl CredentialSource for ClientCredentialsSource {
	fn kind(&self) -> AuthorizerKind {
		AuthorizerKind::ClientCredentials
	}

	fn fetch<'a>(&'a self, _: &'a TokenState) -> SourceFuture<'a> {
		Box::pin(async move { self.client.oauth2_client_credentials_tokens(&self.scopes).await })
	}
}
