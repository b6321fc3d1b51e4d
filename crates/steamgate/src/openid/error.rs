//! OpenID validation errors.

use thiserror::Error;

/// Result type for OpenID operations.
pub type OpenIdResult<T> = Result<T, OpenIdError>;

/// Errors that can occur while validating a provider callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenIdError {
    /// The provider could not be reached, timed out, or answered with an error status.
    #[error("failed to reach OpenID provider: {0}")]
    Transport(String),

    /// The verification response was missing or unparsable.
    #[error("malformed verification response: {0}")]
    MalformedResponse(String),

    /// The provider explicitly rejected the assertion.
    #[error("OpenID assertion rejected by provider")]
    AssertionInvalid,

    /// The callback query itself is not a usable positive assertion.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
}
