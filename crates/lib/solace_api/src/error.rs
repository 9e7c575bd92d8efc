//! Application error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use solace_core::auth::AuthError;
use solace_core::contacts::ContactError;
use solace_core::llm::LlmError;
use solace_core::mood::MoodError;
use thiserror::Error;
use tracing::{error, warn};

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Detail is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::ServiceUnavailable(m) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", m.as_str())
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(format!("database: {e}"))
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                AppError::Unauthorized("Incorrect username or password".into())
            }
            AuthError::InvalidToken => AppError::Unauthorized("Invalid or expired token".into()),
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::Conflict(msg) => AppError::Conflict(msg),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::RegistrationDisabled => {
                AppError::Forbidden("Registration is disabled".into())
            }
            AuthError::DbError(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Config(msg) => AppError::Internal(msg),
            other => {
                warn!(error = %other, "language model unavailable");
                AppError::ServiceUnavailable("Language model service unavailable".into())
            }
        }
    }
}

impl From<MoodError> for AppError {
    fn from(e: MoodError) -> Self {
        match e {
            MoodError::Validation(msg) => AppError::Validation(msg),
            MoodError::NotFound => AppError::NotFound("Mood entry not found".into()),
            MoodError::Db(e) => AppError::from(e),
        }
    }
}

impl From<ContactError> for AppError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::Validation(msg) => AppError::Validation(msg),
            ContactError::NotFound => AppError::NotFound("Emergency contact not found".into()),
            ContactError::Duplicate => AppError::Conflict(
                "Contact with this phone number already exists for this user".into(),
            ),
            ContactError::Db(e) => AppError::from(e),
        }
    }
}
