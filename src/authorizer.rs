//! Authorizers decorate outgoing requests with credentials.
//!
//! Every authorizer implements [`Authorizer`]. Static and null authorizers never recover from an
//! authentication failure; renewing authorizers own a [`TokenState`] and obtain new access tokens
//! from a [`CredentialSource`] whenever the current one is missing or past its effective expiry.

pub mod renewing;
pub mod source;

pub use renewing::*;
pub use source::*;

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
// self
use crate::{_prelude::*, auth::TokenSecret, error::UsageError};

/// Boxed future returned by [`Authorizer`] methods.
pub type AuthorizerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Capability that sets the `Authorization` header of outgoing requests.
pub trait Authorizer
where
	Self: Send + Sync,
{
	/// Variant label used by client compatibility checks.
	fn kind(&self) -> AuthorizerKind;

	/// Sets (or removes) the `Authorization` header, renewing credentials first when needed.
	fn decorate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthorizerFuture<'a, Result<()>>;

	/// Called after a 401; returns true when a retry may succeed with fresh credentials.
	fn recover_from_auth_failure(&self) -> AuthorizerFuture<'_, bool>;
}

/// Authorizer variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthorizerKind {
	/// Removes the `Authorization` header.
	Null,
	/// Fixed bearer token.
	Bearer,
	/// Fixed basic credentials.
	Basic,
	/// Renews through the refresh-token grant.
	RefreshToken,
	/// Renews through the client-credentials grant.
	ClientCredentials,
}
impl AuthorizerKind {
	/// Returns a stable label suitable for log fields and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthorizerKind::Null => "null",
			AuthorizerKind::Bearer => "bearer",
			AuthorizerKind::Basic => "basic",
			AuthorizerKind::RefreshToken => "refresh_token",
			AuthorizerKind::ClientCredentials => "client_credentials",
		}
	}

	/// Fails with [`UsageError::IncompatibleAuthorizer`] unless `self` is listed in `allowed`.
	pub fn ensure_allowed(
		self,
		client: &'static str,
		allowed: &[AuthorizerKind],
	) -> Result<(), UsageError> {
		if allowed.contains(&self) {
			Ok(())
		} else {
			Err(UsageError::IncompatibleAuthorizer { client, authorizer: self.as_str() })
		}
	}
}
impl Display for AuthorizerKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Authorizer with a precomputed header value.
pub struct StaticAuthorizer {
	kind: AuthorizerKind,
	header: HeaderValue,
}
impl StaticAuthorizer {
	/// `Authorization: Bearer <token>`.
	pub fn bearer(token: TokenSecret) -> Result<Self> {
		tracing::info!(
			token_fingerprint = %token.fingerprint(),
			"Setting up a static bearer authorizer."
		);

		Ok(Self { kind: AuthorizerKind::Bearer, header: header_value(&format!("Bearer {}", token.expose()))? })
	}

	/// `Authorization: Basic base64(username:password)`.
	pub fn basic(username: &str, password: &TokenSecret) -> Result<Self> {
		tracing::info!(%username, "Setting up a basic authorizer.");

		let encoded = STANDARD.encode(format!("{username}:{}", password.expose()));

		Ok(Self { kind: AuthorizerKind::Basic, header: header_value(&format!("Basic {encoded}"))? })
	}
}
impl Debug for StaticAuthorizer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StaticAuthorizer")
			.field("kind", &self.kind)
			.field("header", &"<redacted>")
			.finish()
	}
}
impl Authorizer for StaticAuthorizer {
	fn kind(&self) -> AuthorizerKind {
		self.kind
	}

	fn decorate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthorizerFuture<'a, Result<()>> {
		Box::pin(async move {
			headers.insert(AUTHORIZATION, self.header.clone());

			Ok(())
		})
	}

	fn recover_from_auth_failure(&self) -> AuthorizerFuture<'_, bool> {
		Box::pin(async { false })
	}
}

/// Authorizer that strips any `Authorization` header.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAuthorizer;
impl Authorizer for NullAuthorizer {
	fn kind(&self) -> AuthorizerKind {
		AuthorizerKind::Null
	}

	fn decorate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthorizerFuture<'a, Result<()>> {
		Box::pin(async move {
			headers.remove(AUTHORIZATION);

			Ok(())
		})
	}

	fn recover_from_auth_failure(&self) -> AuthorizerFuture<'_, bool> {
		Box::pin(async { false })
	}
}

pub(crate) fn header_value(value: &str) -> Result<HeaderValue> {
	let mut header = HeaderValue::from_str(value).map_err(|_| UsageError::InvalidRequest {
		reason: "credentials contain characters that cannot appear in a header".into(),
	})?;

	header.set_sensitive(true);

	Ok(header)
}
