//! API error handling

use crate::auth::{AuthError, IdentityError};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hotel_core::HotelError;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Individual validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<IdentityError>>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            errors: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn validation(errors: Vec<IdentityError>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::new("VALIDATION_ERROR", "One or more validation errors occurred")
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Authentication required")
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Validation(Vec<IdentityError>),
    Unauthorized,
    Conflict(String),
    Internal(String),
    Database(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::not_found(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, ApiError::validation(errors))
            }
            AppError::Unauthorized => {
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Bearer")],
                    Json(ApiError::unauthorized()),
                )
                    .into_response();
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::conflict(msg)),
            // Internals stay in the log, never in the body.
            AppError::Internal(msg) => {
                error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
            AppError::Database(msg) => {
                error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("DATABASE_ERROR", "Database operation failed"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<HotelError> for AppError {
    fn from(err: HotelError) -> Self {
        match err {
            e @ HotelError::NotFound { .. } => AppError::NotFound(e.to_string()),
            HotelError::Validation(msg) => AppError::BadRequest(msg),
            e @ HotelError::Concurrency { .. } => AppError::Conflict(e.to_string()),
            HotelError::Database(msg) => AppError::Database(msg),
            HotelError::Config(msg) => AppError::Internal(format!("Configuration error: {msg}")),
            HotelError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(validation_errors(&errors))
    }
}

/// Flatten field errors into `{code, description}` items, sorted by field
pub fn validation_errors(errors: &ValidationErrors) -> Vec<IdentityError> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| IdentityError {
                code: field.to_string(),
                description: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid")),
            })
        })
        .collect()
}
