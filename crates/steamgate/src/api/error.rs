//! API error handling with structured JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use tracing::{debug, error};

use crate::auth::SigningError;
use crate::openid::OpenIdError;
use crate::profile::ProfileError;

/// Sentinel `code` carried by responses for expired tokens.
pub const EXPIRED_TOKEN_CODE: u8 = 1;

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timed out")]
    RequestTimeout,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    /// Set to 1 when the bearer token has expired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u8>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side detail stays in the log.
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(status = status.as_u16(), message = %detail, "API error");
                "internal server error".to_string()
            }
            other => {
                debug!(status = status.as_u16(), message = %other, "Client error");
                other.to_string()
            }
        };

        (status, Json(ErrorResponse { message, code: None })).into_response()
    }
}

impl From<OpenIdError> for ApiError {
    fn from(err: OpenIdError) -> Self {
        match err {
            OpenIdError::MalformedCallback(_) | OpenIdError::AssertionInvalid => {
                ApiError::BadRequest(err.to_string())
            }
            OpenIdError::Transport(_) | OpenIdError::MalformedResponse(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<SigningError> for ApiError {
    fn from(err: SigningError) -> Self {
        ApiError::Internal(format!("signing session tokens: {err}"))
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::PlayerNotFound(_) => ApiError::NotFound(err.to_string()),
            ProfileError::Steam(_) | ProfileError::Database(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
