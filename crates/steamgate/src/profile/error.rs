//! Profile lookup error types.

use thiserror::Error;

/// Result type for profile operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Errors that can occur while assembling a player profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The Steam Web API could not be reached or answered with garbage.
    #[error("Steam Web API request failed: {0}")]
    Steam(String),

    /// Steam knows no player with this id.
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    /// Reading persisted statistics failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for ProfileError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProfileError::Steam("request timed out".to_string())
        } else {
            ProfileError::Steam(err.to_string())
        }
    }
}
