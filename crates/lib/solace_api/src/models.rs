//! Request and response bodies.
//!
//! Field names are snake_case; a few request fields also accept the
//! camelCase spelling older clients send.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solace_core::emotion::EmotionResult;
use solace_core::llm::ChatMessage;
use solace_core::models::auth::{RefreshTokenRecord, TokenPair, User, UserType};
use solace_core::triage::AgentDecision;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default, alias = "userType")]
    pub user_type: Option<UserType>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "userType")]
    pub user_type: Option<UserType>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            user_type: u.user_type,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub user: UserResponse,
}

impl From<TokenPair> for TokenResponse {
    fn from(p: TokenPair) -> Self {
        Self {
            access_token: p.access_token,
            refresh_token: p.refresh_token,
            token_type: "bearer",
            expires_in: p.expires_in,
            refresh_expires_in: p.refresh_expires_in,
            user: p.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub message: String,
    pub revoked: u64,
}

/// Session metadata. Never includes the token or its hash.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl From<RefreshTokenRecord> for SessionResponse {
    fn from(r: RefreshTokenRecord) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at,
            expires_at: r.expires_at,
            user_agent: r.user_agent,
            ip_address: r.ip_address,
        }
    }
}

// ---------------------------------------------------------------------------
// Emotion, triage, chat
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

pub type EmotionResponse = EmotionResult;
pub type DecisionResponse = AgentDecision;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub decision: AgentDecision,
}

// ---------------------------------------------------------------------------
// Mood journal
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MoodEntryRequest {
    #[serde(alias = "moodScore")]
    pub mood_score: i32,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Emergency contacts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    #[serde(alias = "phoneNumber")]
    pub phone_number: String,
    #[serde(default, alias = "relationshipType")]
    pub relationship_type: Option<String>,
}
