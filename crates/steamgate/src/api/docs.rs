//! Generated OpenAPI document.

use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::TokenPair;
use crate::profile::Profile;

use super::error::ErrorResponse;
use super::handlers::{self, HealthResponse, RefreshForm};

#[derive(OpenApi)]
#[openapi(
    info(title = "steamgate", description = "Steam sign-in and session token API"),
    paths(
        handlers::health,
        handlers::login,
        handlers::process_login,
        handlers::refresh_tokens,
        handlers::get_profile,
    ),
    components(schemas(HealthResponse, TokenPair, RefreshForm, Profile, ErrorResponse)),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Steam login and session tokens"),
        (name = "profile", description = "Player profile"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Registers the `BearerAuth` scheme the protected paths refer to.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "BearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Serve the OpenAPI document as JSON.
pub async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_endpoint() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/health",
            "/api/auth/login",
            "/api/auth/process",
            "/api/auth/refresh",
            "/api/profile",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("BearerAuth"));
        assert!(components.schemas.contains_key("TokenPair"));
    }
}
