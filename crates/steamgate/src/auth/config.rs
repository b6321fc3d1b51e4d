//! Authentication configuration.

use serde::{Deserialize, Serialize};

use super::tokens::{LifetimeError, SigningSecret, TokenLifetimes};

/// Minimum accepted length for the signing secret.
pub const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing session tokens. Supports `env:VAR_NAME`.
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds.
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds. Must exceed `access_ttl_secs`.
    pub refresh_ttl_secs: u64,

    /// Allowed CORS origins. If empty, cross-origin requests are denied.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default secret - must be explicitly configured
            jwt_secret: None,
            access_ttl_secs: TokenLifetimes::DEFAULT_ACCESS_SECS,
            refresh_ttl_secs: TokenLifetimes::DEFAULT_REFRESH_SECS,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        self.jwt_secret
            .as_deref()
            .map(resolve_env_reference)
            .transpose()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }

        self.lifetimes()?;
        Ok(())
    }

    /// The validated signing secret.
    pub fn signing_secret(&self) -> Result<SigningSecret, ConfigValidationError> {
        self.validate()?;
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;
        Ok(SigningSecret::new(secret))
    }

    pub fn lifetimes(&self) -> Result<TokenLifetimes, ConfigValidationError> {
        TokenLifetimes::from_secs(self.access_ttl_secs, self.refresh_ttl_secs)
            .map_err(ConfigValidationError::Lifetimes)
    }

    /// Generate a random secret suitable for `jwt_secret`.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Expand an `env:VAR_NAME` reference, or return the value unchanged.
pub fn resolve_env_reference(value: &str) -> Result<String, ConfigValidationError> {
    let Some(var_name) = value.strip_prefix("env:") else {
        return Ok(value.to_string());
    };

    match std::env::var(var_name) {
        Ok(resolved) if !resolved.is_empty() => Ok(resolved),
        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// No JWT secret configured.
    MissingJwtSecret,
    /// JWT secret is too short.
    JwtSecretTooShort,
    /// Token lifetimes are inconsistent.
    Lifetimes(LifetimeError),
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    EnvVarEmpty(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingJwtSecret => {
                write!(
                    f,
                    "JWT secret is required. Set STEAMGATE__AUTH__JWT_SECRET or auth.jwt_secret in config."
                )
            }
            Self::JwtSecretTooShort => {
                write!(
                    f,
                    "JWT secret must be at least {MIN_SECRET_LEN} characters long."
                )
            }
            Self::Lifetimes(err) => write!(f, "invalid token lifetimes: {err}"),
            Self::EnvVarNotFound(var) => {
                write!(
                    f,
                    "Environment variable '{}' not found (referenced via env:{} in config).",
                    var, var
                )
            }
            Self::EnvVarEmpty(var) => {
                write!(
                    f,
                    "Environment variable '{}' is empty (referenced via env:{} in config).",
                    var, var
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}
