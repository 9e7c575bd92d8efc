//! Authentication middleware: Bearer token extraction and JWT verification.

use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// Identity of the caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

fn unauthorized() -> AppError {
    AppError::Unauthorized("Could not validate credentials".into())
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, verifies the JWT,
/// and injects `AuthenticatedUser` into request extensions.
///
/// Every failure produces the same response.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(unauthorized)?;

    let claims = state.sessions.authenticate(token).ok_or_else(unauthorized)?;
    let user_id = Uuid::parse_str(&claims.user_id).map_err(|_| {
        debug!("access token carried a malformed user_id");
        unauthorized()
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
