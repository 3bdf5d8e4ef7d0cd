//! Grant responses indexed by resource server.
//!
//! A grant response carries one token set at the top level and zero or more additional sets in
//! `other_tokens`; each set belongs to one resource server.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
	error::TokenRenewalError,
};

/// Token set issued for one resource server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenData {
	/// Resource server the token is valid for.
	pub resource_server: String,
	/// Access token.
	pub access_token: TokenSecret,
	/// Lifetime in seconds from issuance.
	#[serde(default)]
	pub expires_in: i64,
	/// Space-delimited granted scopes.
	#[serde(default)]
	pub scope: String,
	/// Refresh token, when the grant issued one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Token type, usually `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
}
impl TokenData {
	/// Granted scopes.
	pub fn scopes(&self) -> ScopeSet {
		ScopeSet::parse(&self.scope)
	}
}

#[derive(Deserialize)]
struct WireTokenResponse {
	#[serde(flatten)]
	primary: TokenData,
	#[serde(default)]
	other_tokens: Vec<TokenData>,
}

/// Parsed grant response.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenResponse {
	/// Raw JSON document.
	pub raw: Value,
	/// Token sets keyed by resource server.
	pub by_resource_server: BTreeMap<String, TokenData>,
}
impl TokenResponse {
	/// Parses a grant response document.
	pub fn from_json(raw: Value) -> Result<Self> {
		let wire: WireTokenResponse = serde_path_to_error::deserialize(&raw)
			.map_err(|source| TokenRenewalError::MalformedResponse { source })?;
		let by_resource_server = std::iter::once(wire.primary)
			.chain(wire.other_tokens)
			.map(|data| (data.resource_server.clone(), data))
			.collect();

		Ok(Self { raw, by_resource_server })
	}

	/// The only token set in the response.
	pub fn single(&self) -> Result<&TokenData, TokenRenewalError> {
		let mut sets = self.by_resource_server.values();

		match (sets.next(), sets.next()) {
			(Some(data), None) => Ok(data),
			_ => Err(TokenRenewalError::AmbiguousToken {
				found: self.by_resource_server.len(),
				resource_servers: self.by_resource_server.keys().cloned().collect(),
			}),
		}
	}

	/// Token set for `resource_server`.
	pub fn for_resource_server(&self, resource_server: &str) -> Option<&TokenData> {
		self.by_resource_server.get(resource_server)
	}

	/// Token set whose granted scopes cover every scope in `scopes`.
	///
	/// Resolves only when all requested scopes belong to the same resource server.
	pub fn by_scopes(&self, scopes: &str) -> Option<&TokenData> {
		let wanted = ScopeSet::parse(scopes);

		if wanted.is_empty() {
			return None;
		}

		let mut owner = None;

		for scope in wanted.iter() {
			let data = self.by_resource_server.values().find(|d| d.scopes().contains(scope))?;

			match owner {
				None => owner = Some(data),
				Some(prev) if prev.resource_server == data.resource_server => {},
				Some(_) => return None,
			}
		}

		owner
	}
}
