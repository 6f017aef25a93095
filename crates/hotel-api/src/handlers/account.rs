//! Account handlers: registration, login and token refresh

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{ApiUserDto, AuthResponse, LoginDto};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[utoipa::path(
    post,
    path = "/api/v1/account/register",
    tag = "account",
    request_body = ApiUserDto,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Invalid body or identity errors", body = crate::error::ApiError)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(dto): Json<ApiUserDto>,
) -> Result<StatusCode, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    dto.validate()?;

    let errors = state.auth.register(&dto).await?;
    if !errors.is_empty() {
        let reason = errors
            .iter()
            .map(|e| e.code.as_str())
            .collect::<Vec<_>>()
            .join(",");
        audit_log(&AuditEvent::RegistrationFailure {
            email: dto.email,
            reason,
            ip_address,
            user_agent,
        });
        return Err(AppError::Validation(errors));
    }

    audit_log(&AuditEvent::RegistrationSuccess {
        email: dto.email,
        ip_address,
        user_agent,
    });
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/account/login",
    tag = "account",
    request_body = LoginDto,
    responses(
        (status = 200, description = "Access and refresh tokens", body = AuthResponse),
        (status = 400, description = "Invalid body", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(dto): Json<LoginDto>,
) -> Result<Json<AuthResponse>, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    dto.validate()?;

    match state.auth.login(&dto).await? {
        Some(response) => {
            audit_log(&AuditEvent::LoginSuccess {
                user_id: response.user_id.clone(),
                email: dto.email,
                ip_address,
                user_agent,
            });
            Ok(Json(response))
        }
        None => {
            audit_log(&AuditEvent::LoginFailure {
                email: dto.email,
                reason: INVALID_CREDENTIALS.to_string(),
                ip_address,
                user_agent,
            });
            Err(AppError::Unauthorized)
        }
    }
}

/// Trade an access token and its refresh token for a new pair
#[utoipa::path(
    post,
    path = "/api/v1/account/refreshtoken",
    tag = "account",
    request_body = AuthResponse,
    responses(
        (status = 200, description = "New access and refresh tokens", body = AuthResponse),
        (status = 401, description = "Refresh rejected", body = crate::error::ApiError)
    )
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AuthResponse>,
) -> Result<Json<AuthResponse>, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    match state.auth.verify_refresh_token(&request).await? {
        Some(response) => {
            audit_log(&AuditEvent::TokenRefresh {
                user_id: response.user_id.clone(),
                ip_address,
                user_agent,
            });
            Ok(Json(response))
        }
        None => {
            audit_log(&AuditEvent::RefreshRejected {
                user_id: request.user_id,
                ip_address,
                user_agent,
            });
            Err(AppError::Unauthorized)
        }
    }
}
