//! Token claims, identities and issued token pairs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Provider-asserted subject id (a SteamID in decimal form).
///
/// Only built from a validated OpenID callback or a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

/// Returned when an identity would be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("identity must not be empty")]
pub struct EmptyIdentity;

impl Identity {
    /// Wrap a subject id, rejecting empty (or all-whitespace) values.
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdentity> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(EmptyIdentity);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = EmptyIdentity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

/// Signed token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject id.
    pub id: String,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: i64,
}

/// Access/refresh pair handed to the client after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    #[schema(value_type = String)]
    pub id: Identity,
    pub access_token: String,
    pub refresh_token: String,
}
