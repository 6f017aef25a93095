//! Security headers applied to every response
//!
//! - X-Content-Type-Options: nosniff
//! - X-Frame-Options: DENY
//! - X-XSS-Protection: 1; mode=block
//! - Strict-Transport-Security: one year, subdomains included
//! - Content-Security-Policy: same origin only
//! - Referrer-Policy: strict-origin-when-cross-origin
//! - Permissions-Policy: no geolocation, camera or microphone

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

const SECURITY_HEADERS: [(HeaderName, &str); 7] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
    (header::CONTENT_SECURITY_POLICY, "default-src 'self'"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        PERMISSIONS_POLICY,
        "geolocation=(), camera=(), microphone=()",
    ),
];

/// Add the security header set, including on error responses
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app(status: StatusCode) -> Router {
        Router::new()
            .route("/probe", get(move || async move { (status, "probe") }))
            .layer(middleware::from_fn(security_headers_middleware))
    }

    async fn probe(status: StatusCode) -> Response {
        let request = Request::builder().uri("/probe").body(Body::empty()).unwrap();
        app(status).oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_every_header_is_set() {
        let response = probe(StatusCode::OK).await;
        let headers = response.headers();

        assert_eq!(headers.get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(headers.get(header::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert_eq!(
            headers.get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=31536000; includeSubDomains"
        );
        assert_eq!(
            headers.get("permissions-policy").unwrap(),
            "geolocation=(), camera=(), microphone=()"
        );
        for (name, _) in SECURITY_HEADERS {
            assert!(headers.contains_key(&name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_headers_on_error_response() {
        let response = probe(StatusCode::NOT_FOUND).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_SECURITY_POLICY).unwrap(),
            "default-src 'self'"
        );
    }
}
