//! Hotel API - REST server for country and hotel listings
//!
//! Reads are public; writes require a bearer access token issued by
//! `/api/v1/account/login` and renewed through `/api/v1/account/refreshtoken`.

pub mod audit;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{http::HeaderValue, middleware as axum_middleware, routing::get, Router};
use handlers::health;
use routes::{api_routes, API_PREFIX};
use state::AppState;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build the application router over the given state
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .nest(API_PREFIX, api_routes(state.clone()))
        .layer(axum_middleware::from_fn(
            middleware::cache_control_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .with_state(state)
}

/// Router over seeded in-memory stores, for tests
pub fn create_router_for_testing() -> Router {
    create_router(Arc::new(AppState::for_testing()))
}

/// Permissive unless explicit origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
