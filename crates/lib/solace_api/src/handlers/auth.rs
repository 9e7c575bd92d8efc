//! Authentication request handlers.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::USER_AGENT};
use axum::{Extension, Json};
use solace_core::auth::accounts::Registration;
use solace_core::models::auth::{ClientMeta, ProfileUpdate};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    LoginRequest, LogoutRequest, MessageResponse, RefreshRequest, RegisterRequest,
    RevokeAllResponse, SessionResponse, TokenResponse, UpdateProfileRequest, UserResponse,
};

/// Column widths of `refresh_tokens.user_agent` / `ip_address`.
const MAX_USER_AGENT_LEN: usize = 500;
const MAX_IP_LEN: usize = 45;

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// User agent and originating address of the request.
///
/// The address is the first `X-Forwarded-For` hop, else `X-Real-IP`.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let header = |name: &'static str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"));
    ClientMeta {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| truncate_chars(v, MAX_USER_AGENT_LEN)),
        ip_address: ip.map(|v| truncate_chars(v, MAX_IP_LEN)),
    }
}

/// `POST /api/auth/register`
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .accounts
        .register(Registration {
            username: body.username,
            email: body.email,
            password: body.password,
            user_type: body.user_type,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// `POST /api/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .sessions
        .login(&body.username, &body.password, client_meta(&headers))
        .await?;
    Ok(Json(pair.into()))
}

/// `POST /api/auth/refresh`: exchange a refresh token for a new pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let pair = state
        .sessions
        .refresh(&body.refresh_token, client_meta(&headers))
        .await?;
    Ok(Json(pair.into()))
}

/// `POST /api/auth/logout`: revoke a refresh token. Always succeeds.
pub async fn logout_handler(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> AppResult<Json<MessageResponse>> {
    if let Some(token) = body.refresh_token.as_deref() {
        state.sessions.logout(token).await?;
    }
    Ok(Json(MessageResponse {
        message: "Successfully logged out".into(),
    }))
}

/// `POST /api/auth/logout-all`: revoke every session of the caller.
pub async fn logout_all_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<RevokeAllResponse>> {
    let revoked = state.sessions.revoke_all(user.user_id).await?;
    Ok(Json(RevokeAllResponse {
        message: "All sessions revoked".into(),
        revoked,
    }))
}

/// `GET /api/auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.accounts.current_user(user.user_id).await?;
    Ok(Json(user.into()))
}

/// `PUT /api/auth/me`
pub async fn update_me_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .accounts
        .update_profile(
            user.user_id,
            ProfileUpdate {
                email: body.email,
                user_type: body.user_type,
            },
        )
        .await?;
    Ok(Json(user.into()))
}

/// `GET /api/auth/sessions`
pub async fn sessions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let sessions = state.accounts.list_sessions(user.user_id).await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_meta_prefers_first_forwarded_hop() {
        let mut h = HeaderMap::new();
        h.insert(USER_AGENT, HeaderValue::from_static("curl/8"));
        h.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        h.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        let meta = client_meta(&h);
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn client_meta_falls_back_and_truncates() {
        let mut h = HeaderMap::new();
        let long_agent = "a".repeat(600);
        h.insert(USER_AGENT, HeaderValue::from_str(&long_agent).unwrap());
        h.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        let meta = client_meta(&h);
        assert_eq!(meta.user_agent.unwrap().len(), MAX_USER_AGENT_LEN);
        assert_eq!(meta.ip_address.as_deref(), Some("10.9.9.9"));
        assert_eq!(client_meta(&HeaderMap::new()), ClientMeta::default());
    }
}
