//! HTTP request handlers.

use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::{CurrentUser, TokenPair};
use crate::profile::Profile;

use super::error::{ApiError, ApiResult, ErrorResponse};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Send the browser to the Steam sign-in page.
#[utoipa::path(
    get,
    path = "/api/auth/login",
    tag = "auth",
    responses((status = 302, description = "Redirect to Steam Community OpenID sign-in"))
)]
pub async fn login(State(state): State<AppState>) -> impl IntoResponse {
    let target = state.openid.redirect_url();
    (StatusCode::FOUND, [(header::LOCATION, target.to_string())])
}

/// Steam redirects back here with a signed assertion.
#[utoipa::path(
    get,
    path = "/api/auth/process",
    tag = "auth",
    responses(
        (status = 200, description = "Assertion confirmed by Steam", body = TokenPair),
        (status = 400, description = "Malformed or rejected assertion", body = ErrorResponse),
        (status = 500, description = "Steam could not be reached", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn process_login(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<TokenPair>> {
    let identity = state.openid.validate_callback(&query).await.map_err(|e| {
        warn!(error = %e, "Steam login failed");
        ApiError::from(e)
    })?;

    let pair = state.tokens.generate_tokens(&identity)?;
    info!(steam_id = %identity, "Issued session tokens");
    Ok(Json(pair))
}

/// Form body of a refresh request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshForm {
    #[serde(default)]
    pub id: String,
}

/// Exchange a still-valid token for a brand-new pair.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body(content = RefreshForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Fresh token pair", body = TokenPair),
        (status = 400, description = "id is missing", body = ErrorResponse),
        (status = 401, description = "Missing, invalid or expired bearer token", body = ErrorResponse),
        (status = 403, description = "id does not match the token", body = ErrorResponse)
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all, fields(steam_id = %user.id()))]
pub async fn refresh_tokens(
    State(state): State<AppState>,
    user: CurrentUser,
    form: Result<Form<RefreshForm>, FormRejection>,
) -> ApiResult<Json<TokenPair>> {
    let id = match form {
        Ok(Form(RefreshForm { id })) if !id.trim().is_empty() => id,
        _ => return Err(ApiError::bad_request("param is not set")),
    };

    if id != user.id() {
        warn!(requested = %id, "Refresh requested for a different identity");
        return Err(ApiError::forbidden("id does not match token"));
    }

    let pair = state.tokens.generate_tokens(&user.identity)?;
    info!("Refreshed session tokens");
    Ok(Json(pair))
}

/// Profile of the authenticated player.
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile of the token holder", body = Profile),
        (status = 401, description = "Missing, invalid or expired bearer token", body = ErrorResponse),
        (status = 404, description = "Steam knows no such player", body = ErrorResponse)
    ),
    security(("BearerAuth" = []))
)]
#[instrument(skip_all, fields(steam_id = %user.id()))]
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Profile>> {
    let profile = state.profiles.profile(&user.identity).await?;
    Ok(Json(profile))
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
