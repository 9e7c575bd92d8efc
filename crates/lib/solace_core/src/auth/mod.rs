//! Authentication and session lifecycle.
//!
//! Provides password hashing, access-token signing, refresh-token rotation,
//! and the storage seam (`store::AuthStore`) with a PostgreSQL
//! implementation and an in-process one.

pub mod accounts;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod refresh;
pub mod session;
pub mod store;

use thiserror::Error;

/// Authentication errors.
///
/// `InvalidCredentials` and `InvalidToken` carry no detail so callers cannot
/// tell which check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Registration is disabled")]
    RegistrationDisabled,

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
