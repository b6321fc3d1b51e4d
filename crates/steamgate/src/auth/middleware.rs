//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;

use super::{AuthError, AuthOutcome, Identity, TokenVerifier};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;

    if parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Where a request stands in the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No usable `Authorization: Bearer` header.
    NoCredential,
    /// A bearer token was found and still has to be verified.
    CredentialPresent(String),
    /// Token verified; the handler may run.
    Verified(Identity),
    /// Correctly signed token past its expiry.
    Expired,
    /// Any other verification failure.
    Rejected(AuthOutcome),
}

impl GateState {
    /// Entry state for a request carrying `header`.
    pub fn from_header(header: Option<&str>) -> Self {
        match header.and_then(bearer_token_from_header) {
            Some(token) => GateState::CredentialPresent(token.to_string()),
            None => GateState::NoCredential,
        }
    }

    /// Run the machine to a terminal state.
    pub fn evaluate(header: Option<&str>, verifier: &TokenVerifier, now: DateTime<Utc>) -> Self {
        match Self::from_header(header) {
            GateState::CredentialPresent(token) => match verifier.verify_token_at(&token, now) {
                AuthOutcome::Verified(identity) => GateState::Verified(identity),
                AuthOutcome::Expired => GateState::Expired,
                AuthOutcome::MissingCredential => GateState::NoCredential,
                other => GateState::Rejected(other),
            },
            terminal => terminal,
        }
    }
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    verifier: Arc<TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}

/// Authenticated caller extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
}

impl CurrentUser {
    /// Get the user ID.
    pub fn id(&self) -> &str {
        self.identity.as_str()
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingCredential)
    }
}

/// Authentication middleware.
///
/// Verifies the bearer token and injects `CurrentUser` into request
/// extensions. Unauthorized requests never reach the wrapped handler.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match GateState::evaluate(header, auth.verifier(), Utc::now()) {
        GateState::Verified(identity) => {
            debug!("Authenticated request for {}", identity);
            req.extensions_mut().insert(CurrentUser { identity });
            Ok(next.run(req).await)
        }
        GateState::Expired => {
            debug!("Rejected expired token");
            Err(AuthError::TokenExpired)
        }
        GateState::Rejected(outcome) => {
            warn!("Rejected token: {}", outcome.label());
            Err(match outcome {
                AuthOutcome::Malformed => AuthError::TokenMalformed,
                _ => AuthError::TokenInvalidSignature,
            })
        }
        GateState::NoCredential | GateState::CredentialPresent(_) => {
            Err(AuthError::MissingCredential)
        }
    }
}
