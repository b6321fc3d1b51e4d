//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::{EXPIRED_TOKEN_CODE, ErrorResponse};

/// Authentication errors raised by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header.
    #[error("missing credential")]
    MissingCredential,

    /// Token could not be parsed.
    #[error("malformed token")]
    TokenMalformed,

    /// Signature or algorithm check failed.
    #[error("invalid token signature")]
    TokenInvalidSignature,

    /// Token expired.
    #[error("token expired")]
    TokenExpired,
}

impl AuthError {
    /// Message sent to the client. Signature and parse failures share one.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing credential",
            AuthError::TokenExpired => "token expired",
            AuthError::TokenMalformed | AuthError::TokenInvalidSignature => "invalid token",
        }
    }

    /// Sentinel code; only expired tokens carry one.
    pub fn code(&self) -> Option<u8> {
        match self {
            AuthError::TokenExpired => Some(EXPIRED_TOKEN_CODE),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            message: self.public_message().to_string(),
            code: self.code(),
        });

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}
