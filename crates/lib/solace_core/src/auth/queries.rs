//! Auth-related database queries (PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::AuthError;
use super::store::AuthStore;
use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserType,
    UserWithPassword,
};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str = "id, username, email, user_type, created_at, updated_at, password_hash";

const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, is_revoked, \
                               revoked_at, user_agent, ip_address";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: Option<String>,
    user_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    password_hash: String,
}

impl UserRow {
    fn into_user(self) -> UserWithPassword {
        let user_type = self.user_type.parse().unwrap_or_else(|_| {
            warn!(user_id = %self.id, user_type = %self.user_type, "unknown user_type, using general");
            UserType::General
        });
        UserWithPassword {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                user_type,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    is_revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    user_agent: Option<String>,
    ip_address: Option<String>,
}

impl From<RefreshRow> for RefreshTokenRecord {
    fn from(r: RefreshRow) -> Self {
        RefreshTokenRecord {
            id: r.id,
            user_id: r.user_id,
            token_hash: r.token_hash,
            expires_at: r.expires_at,
            created_at: r.created_at,
            is_revoked: r.is_revoked,
            revoked_at: r.revoked_at,
            user_agent: r.user_agent,
            ip_address: r.ip_address,
        }
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else passes through.
fn conflict_or_db(e: sqlx::Error, what: &str) -> AuthError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return AuthError::Conflict(format!("{what} already exists"));
    }
    AuthError::DbError(e)
}

/// PostgreSQL-backed [`AuthStore`].
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, email, password_hash, user_type) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "username or email"))?;
        Ok(row.into_user().user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(UserRow::into_user))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.into_user().user))
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AuthError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users \
             SET email = COALESCE($2, email), \
                 user_type = COALESCE($3, user_type), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.email)
        .bind(update.user_type.map(|t| t.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "email"))?;
        Ok(row.map(|r| r.into_user().user))
    }

    async fn insert_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let row = sqlx::query_as::<_, RefreshRow>(&format!(
            "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, user_agent, ip_address) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {REFRESH_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(&token.client.user_agent)
        .bind(&token.client.ip_address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "refresh token"))?;
        Ok(row.into())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        let row = sqlx::query_as::<_, RefreshRow>(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn consume_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        // Row lock + re-check of the WHERE clause makes this at-most-once.
        let row = sqlx::query_as::<_, RefreshRow>(&format!(
            "UPDATE refresh_tokens SET is_revoked = true, revoked_at = $2 \
             WHERE token_hash = $1 AND is_revoked = false AND expires_at >= $2 \
             RETURNING {REFRESH_COLUMNS}"
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, AuthError> {
        let matched = sqlx::query_scalar::<_, bool>(
            "WITH upd AS ( \
                 UPDATE refresh_tokens SET is_revoked = true, revoked_at = now() \
                 WHERE token_hash = $1 AND is_revoked = false RETURNING id \
             ) \
             SELECT EXISTS(SELECT 1 FROM upd) \
                 OR EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(matched)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = true, revoked_at = now() \
             WHERE user_id = $1 AND is_revoked = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let rows = sqlx::query_as::<_, RefreshRow>(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens \
             WHERE user_id = $1 AND is_revoked = false AND expires_at >= $2 \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
