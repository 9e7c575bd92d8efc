//! Storage seam for users and refresh-token records.
//!
//! `queries::PgAuthStore` is the production implementation;
//! `memory::MemoryAuthStore` backs tests and local tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserWithPassword,
};

#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Insert a user. Duplicate username or email yields `AuthError::Conflict`.
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError>;

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError>;

    /// Whether `email` belongs to any user other than `except`.
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AuthError>;

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, AuthError>;

    /// Insert a refresh token record. `token_hash` is unique.
    async fn insert_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError>;

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Atomically revoke the record for `token_hash` if it is still valid at
    /// `now`, returning it. Of any number of concurrent callers with the
    /// same hash, at most one gets `Some`.
    async fn consume_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError>;

    /// Revoke the record for `token_hash`. Returns whether a record matched.
    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, AuthError>;

    /// Revoke every non-revoked record for a user. Returns the count.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError>;

    /// Active (unrevoked, unexpired) records for a user, newest first.
    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError>;

    /// Delete records with `expires_at < now`. Returns the count.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}
