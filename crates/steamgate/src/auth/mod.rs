//! Authentication module.
//!
//! Provides:
//! - HS256 session token issuance with separate access/refresh lifetimes
//! - Token verification with an explicit HMAC algorithm-family check
//! - Bearer-token gate middleware for protected routes

mod claims;
mod config;
mod error;
mod middleware;
mod tokens;

pub use claims::{EmptyIdentity, Identity, TokenClaims, TokenPair};
pub use config::{AuthConfig, ConfigValidationError, MIN_SECRET_LEN, resolve_env_reference};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, GateState, auth_middleware};
pub use tokens::{
    AuthOutcome, LifetimeError, SIGNING_ALGORITHM, SigningError, SigningSecret, TokenGenerator,
    TokenIssuer, TokenLifetimes, TokenVerifier,
};
