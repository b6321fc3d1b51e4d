//! API route definitions.

use axum::error_handling::HandleErrorLayer;
use axum::http::{HeaderValue, Method, header};
use axum::{
    BoxError, Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::docs;
use super::error::ApiError;
use super::handlers;
use super::state::AppState;

/// Create the application router with all routes nested under `/api`.
pub fn create_router(state: AppState) -> Router {
    Router::new().nest("/api", api_routes(state))
}

fn api_routes(state: AppState) -> Router {
    let cors = build_cors_layer(&state.allowed_origins);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let timeout = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_middleware_error))
        .layer(TimeoutLayer::new(state.request_timeout));
    let gate = middleware::from_fn_with_state(state.auth.clone(), auth_middleware);

    // Protected routes (require a valid bearer token). The gate is a route
    // layer so an unsupported method still answers 405 without credentials.
    let protected_routes = Router::new()
        .route(
            "/auth/refresh",
            post(handlers::refresh_tokens)
                .route_layer(gate.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/profile",
            get(handlers::get_profile)
                .route_layer(gate)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .route(
            "/docs",
            get(docs::openapi).fallback(handlers::method_not_allowed),
        )
        .route(
            "/auth/login",
            get(handlers::login).fallback(handlers::method_not_allowed),
        )
        .route(
            "/auth/process",
            get(handlers::process_login).fallback(handlers::method_not_allowed),
        )
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(timeout)
        .layer(cors)
        .layer(trace_layer)
}

/// Map errors raised by the service middleware to JSON responses.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::RequestTimeout
    } else {
        ApiError::Internal(format!("unhandled middleware error: {err}"))
    }
}

/// Build the CORS layer for the configured origins.
///
/// With no configured origins every cross-origin request is denied.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT];

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No origins configured, denying all cross-origin requests");
        return CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(methods)
        .allow_headers(headers)
}
