//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! shapes in `solace_api::models`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience segment a user registered as. Drives tone of suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    YoungProfessional,
    PregnantWoman,
    #[default]
    General,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "student",
            UserType::YoungProfessional => "young_professional",
            UserType::PregnantWoman => "pregnant_woman",
            UserType::General => "general",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserType::Student),
            "young_professional" => Ok(UserType::YoungProfessional),
            "pregnant_woman" => Ok(UserType::PregnantWoman),
            "general" => Ok(UserType::General),
            other => Err(format!("unknown user type: {other}")),
        }
    }
}

/// Domain user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with password hash (for internal auth flows).
#[derive(Clone)]
pub struct UserWithPassword {
    pub user: User,
    /// `"{salt}${hex(derived)}"`.
    pub password_hash: String,
}

impl fmt::Debug for UserWithPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserWithPassword")
            .field("user", &self.user)
            .field("password_hash", &"***")
            .finish()
    }
}

/// Fields for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub user_type: UserType,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub user_type: Option<UserType>,
}

/// Optional client metadata recorded alongside a refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

/// Refresh token record stored in the database. Never carries the plaintext.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// `!is_revoked && now <= expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired_at(now)
    }
}

/// Fields for inserting a refresh token record.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub client: ClientMeta,
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the username (standard JWT `sub` claim).
    pub sub: String,
    /// Stable user id.
    pub user_id: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Token type tag, always `"access"` for tokens this service accepts.
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Access + refresh pair handed to the client. The refresh plaintext exists
/// only here, exactly once.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
    pub user: User,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_in", &self.expires_in)
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("user", &self.user)
            .finish()
    }
}
