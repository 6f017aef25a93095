//! Response caching policy
//!
//! Every response may be cached by shared caches for ten seconds, keyed
//! additionally on the request's Accept-Encoding. Account responses carry
//! credentials and are never stored.

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const CACHE_MAX_AGE_SECS: u32 = 10;

/// Path segment shared by register, login and refresh
const ACCOUNT_SEGMENT: &str = "/account/";

pub async fn cache_control_middleware(request: Request, next: Next) -> Response {
    let carries_credentials = request.uri().path().contains(ACCOUNT_SEGMENT);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    if carries_credentials {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        return response;
    }

    let cache_control = format!("public, max-age={CACHE_MAX_AGE_SECS}");
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cache_headers() {
        let app = Router::new()
            .route("/", get(|| async { "cached" }))
            .layer(middleware::from_fn(cache_control_middleware));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=10"
        );
        assert_eq!(response.headers().get(header::VARY).unwrap(), "Accept-Encoding");
    }

    #[tokio::test]
    async fn test_account_responses_not_stored() {
        let app = Router::new()
            .route("/api/v1/account/login", axum::routing::post(|| async { "token" }))
            .layer(middleware::from_fn(cache_control_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/account/login")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
    }
}
