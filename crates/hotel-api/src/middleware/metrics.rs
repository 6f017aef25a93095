//! Request counting middleware
//!
//! Bumps the shared request counter and logs each request's latency at debug
//! level under its normalized endpoint.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let endpoint = normalize_endpoint(request.uri().path());

    state.increment_requests();
    let response = next.run(request).await;

    debug!(
        method = %method,
        endpoint = %endpoint,
        status = response.status().as_u16(),
        latency_us = start.elapsed().as_micros() as u64,
        "Request completed"
    );

    response
}

/// Replace numeric path segments with `:id` so per-row routes group together
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
