//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod pagination;
pub mod routes;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::state::AppState;

pub use routes::{protected_router, public_router};

/// Build the application router
///
/// Layers run outermost first: context -> logging -> (auth -> rate limit) -> handler.
pub fn build_router(state: AppState) -> Result<Router, ConfigError> {
    let protected = protected_router()
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    let api = public_router().merge(protected);

    let origin: HeaderValue = state
        .config
        .cors_origin
        .parse()
        .map_err(|_| ConfigError::InvalidValue("CORS_ORIGIN"))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(middleware::CORRELATION_ID_HEADER),
        ])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(from_fn(middleware::logging_middleware))
        .layer(from_fn(middleware::context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
