//! Renewing authorizers that track access-token expiry and obtain new tokens on demand.
//!
//! State machine: an authorizer starts UNINITIALIZED unless seeded with an access token and its
//! expiry, becomes VALID after a renewal, and is EXPIRED once the clock reaches the effective
//! expiry (declared expiry minus [`RenewingAuthorizer::RENEWAL_SKEW`]) or a 401 cleared it. Every
//! EXPIRED or UNINITIALIZED state renews on the next [`Authorizer::decorate`] call.
//!
//! The token state lives behind an async mutex held across the whole renewal, so concurrent
//! requests sharing one authorizer trigger at most one grant exchange.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	auth::{TokenData, TokenResponse, TokenSecret},
	authorizer::{
		Authorizer, AuthorizerFuture, AuthorizerKind, ClientCredentialsSource, CredentialSource,
		RefreshTokenSource, header_value,
	},
	clock::{Clock, SystemClock},
	error::TokenRenewalError,
	obs::{self, RenewalOutcome},
};

/// Observer invoked with the raw grant response after every successful renewal.
pub type OnRefresh = Arc<dyn Fn(&TokenResponse) + Send + Sync>;

/// Authorizer renewing through the refresh-token grant.
pub type RefreshTokenAuthorizer = RenewingAuthorizer<RefreshTokenSource>;
/// Authorizer renewing through the client-credentials grant.
pub type ClientCredentialsAuthorizer = RenewingAuthorizer<ClientCredentialsSource>;

/// Credentials owned by one renewing authorizer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenState {
	/// Current access token.
	pub access_token: Option<TokenSecret>,
	/// Effective expiry (declared expiry minus the renewal skew).
	pub expires_at: Option<OffsetDateTime>,
	/// Refresh token for refresh-capable sources.
	pub refresh_token: Option<TokenSecret>,
}
impl TokenState {
	/// Returns true when the access token is missing or the effective expiry has been reached.
	pub fn needs_renewal(&self, now: OffsetDateTime) -> bool {
		match (&self.access_token, self.expires_at) {
			(Some(_), Some(expires_at)) => now >= expires_at,
			_ => true,
		}
	}

	fn apply(
		&mut self,
		data: &TokenData,
		received_at: OffsetDateTime,
		skew: Duration,
	) -> Result<(), TokenRenewalError> {
		let expires_at = received_at
			.checked_add(Duration::seconds(data.expires_in))
			.and_then(|at| at.checked_sub(skew))
			.ok_or(TokenRenewalError::InvalidExpiry { expires_in: data.expires_in })?;

		self.access_token = Some(data.access_token.clone());
		self.expires_at = Some(expires_at);

		if let Some(refresh_token) = &data.refresh_token {
			self.refresh_token = Some(refresh_token.clone());
		}

		Ok(())
	}
}

/// Builder for [`RenewingAuthorizer`].
pub struct RenewingAuthorizerBuilder<S> {
	source: S,
	access_token: Option<TokenSecret>,
	expires_at: Option<OffsetDateTime>,
	refresh_token: Option<TokenSecret>,
	clock: Arc<dyn Clock>,
	on_refresh: Option<OnRefresh>,
}
impl<S> RenewingAuthorizerBuilder<S>
where
	S: CredentialSource,
{
	/// Seeds an access token; ignored unless [`expires_at`](Self::expires_at) is also set.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Declared expiry of the seeded access token.
	pub fn expires_at(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}

	/// Refresh token consumed by refresh-capable sources.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Overrides the clock used for expiry decisions.
	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Registers an observer called after every successful renewal.
	pub fn on_refresh(mut self, observer: impl Fn(&TokenResponse) + Send + Sync + 'static) -> Self {
		self.on_refresh = Some(Arc::new(observer));

		self
	}

	/// Builds the authorizer, renewing first when no usable seed token was supplied.
	pub async fn build(self) -> Result<RenewingAuthorizer<S>> {
		let Self { source, access_token, expires_at, refresh_token, clock, on_refresh } = self;
		let now = clock.now();
		let skew = RenewingAuthorizer::<S>::RENEWAL_SKEW;
		let mut state = TokenState { access_token: None, expires_at: None, refresh_token };

		match (access_token, expires_at) {
			(Some(token), Some(expires_at)) => match expires_at.checked_sub(skew) {
				Some(expires_at) => {
					state.access_token = Some(token);
					state.expires_at = Some(expires_at);
				},
				None => tracing::warn!(
					kind = %source.kind(),
					"Seed expiry is out of range and will be replaced by a renewed token."
				),
			},
			(Some(_), None) => tracing::warn!(
				kind = %source.kind(),
				"Seed access token has no expiry and will be replaced by a renewed token."
			),
			(None, Some(_)) =>
				tracing::warn!(kind = %source.kind(), "Seed expiry has no access token; ignoring it."),
			(None, None) => {},
		}

		let needs_renewal = state.needs_renewal(now);
		let authorizer =
			RenewingAuthorizer { source, state: AsyncMutex::new(state), clock, on_refresh };

		if needs_renewal {
			tracing::debug!(kind = %authorizer.kind(), "Authorizer starts without a usable token.");

			authorizer.check_expiration().await?;
		}

		Ok(authorizer)
	}
}

/// Authorizer that renews its access token through a [`CredentialSource`].
pub struct RenewingAuthorizer<S> {
	source: S,
	state: AsyncMutex<TokenState>,
	clock: Arc<dyn Clock>,
	on_refresh: Option<OnRefresh>,
}
impl<S> RenewingAuthorizer<S>
where
	S: CredentialSource,
{
	/// Safety margin subtracted from every declared expiry.
	pub const RENEWAL_SKEW: Duration = Duration::seconds(60);

	/// Starts a builder around `source`.
	pub fn builder(source: S) -> RenewingAuthorizerBuilder<S> {
		RenewingAuthorizerBuilder {
			source,
			access_token: None,
			expires_at: None,
			refresh_token: None,
			clock: Arc::new(SystemClock),
			on_refresh: None,
		}
	}

	/// Credential source backing this authorizer.
	pub fn source(&self) -> &S {
		&self.source
	}

	/// Renews now if the token is missing or expired; otherwise does nothing.
	pub async fn check_expiration(&self) -> Result<()> {
		let mut state = self.state.lock().await;

		self.ensure_fresh(&mut state).await.map(|_| ())
	}

	/// Copy of the current token state.
	pub async fn snapshot(&self) -> TokenState {
		self.state.lock().await.clone()
	}

	async fn ensure_fresh(&self, state: &mut TokenState) -> Result<TokenSecret> {
		match &state.access_token {
			Some(token) if !state.needs_renewal(self.clock.now()) => Ok(token.clone()),
			_ => self.renew(state).await,
		}
	}

	async fn renew(&self, state: &mut TokenState) -> Result<TokenSecret> {
		let kind = self.source.kind();

		obs::record_renewal_outcome(kind, RenewalOutcome::Attempt);
		tracing::debug!(%kind, "Renewing access token.");

		let renewed = async {
			let response = self.source.fetch(state).await.map_err(TokenRenewalError::grant)?;
			let data = response.single()?.clone();

			state.apply(&data, self.clock.now(), Self::RENEWAL_SKEW)?;

			Ok::<_, Error>((response, data))
		}
		.await;
		let (response, data) = match renewed {
			Ok(renewed) => renewed,
			Err(e) => {
				obs::record_renewal_outcome(kind, RenewalOutcome::Failure);
				tracing::warn!(%kind, error = %e, "Access token renewal failed.");

				return Err(e);
			},
		};

		obs::record_renewal_outcome(kind, RenewalOutcome::Success);
		tracing::info!(
			%kind,
			resource_server = %data.resource_server,
			token_fingerprint = %data.access_token.fingerprint(),
			rotated_refresh_token = data.refresh_token.is_some(),
			expires_at = ?state.expires_at,
			"Renewed access token."
		);

		if let Some(observer) = &self.on_refresh {
			observer(&response);
		}

		Ok(data.access_token)
	}
}
impl<S> Debug for RenewingAuthorizer<S>
where
	S: CredentialSource,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RenewingAuthorizer").field("kind", &self.source.kind()).finish_non_exhaustive()
	}
}
impl<S> Authorizer for RenewingAuthorizer<S>
where
	S: CredentialSource,
{
	fn kind(&self) -> AuthorizerKind {
		self.source.kind()
	}

	fn decorate<'a>(&'a self, headers: &'a mut HeaderMap) -> AuthorizerFuture<'a, Result<()>> {
		Box::pin(async move {
			let token = {
				let mut state = self.state.lock().await;

				self.ensure_fresh(&mut state).await?
			};

			headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token.expose()))?);

			Ok(())
		})
	}

	fn recover_from_auth_failure(&self) -> AuthorizerFuture<'_, bool> {
		Box::pin(async move {
			self.state.lock().await.expires_at = None;

			tracing::info!(
				kind = %self.source.kind(),
				"Request was rejected as unauthorized; the next request renews the access token."
			);

			true
		})
	}
}
