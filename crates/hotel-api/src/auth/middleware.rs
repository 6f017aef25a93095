/// Bearer token middleware for write endpoints
///
/// Validates the access token from the Authorization header and adds the
/// authenticated user to the request extensions.
use super::jwt::Claims;
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated caller, available to handlers as `Extension<AuthenticatedUser>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<String>,
    /// JWT token ID
    pub jti: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.uid,
            email: claims.email,
            roles: claims.roles,
            jti: claims.jti,
        }
    }
}

/// Require a valid bearer token
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip_address = extract_ip_address(request.headers());
    let user_agent = extract_user_agent(request.headers());

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)?;

    let claims = match state.auth.tokens().validate_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                ip_address,
                user_agent,
                reason: e.to_string(),
            });
            return Err(AppError::Unauthorized);
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(claims));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::User;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.email
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn request(authorization: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let state = Arc::new(AppState::for_testing());
        let response = app(state).oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        let state = Arc::new(AppState::for_testing());
        let response = app(state).oneshot(request(Some("Basic abc"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let state = Arc::new(AppState::for_testing());
        let user = User::new("guest@example.com", "Ada", "Lovelace");
        let token = state
            .auth
            .tokens()
            .generate_access_token(&user, &["User".to_string()], &[])
            .unwrap();

        let response = app(state)
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"guest@example.com");
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let state = Arc::new(AppState::for_testing());
        let response = app(state)
            .oneshot(request(Some("Bearer not.a.token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
