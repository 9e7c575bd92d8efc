//! In-process [`AuthStore`] backed by concurrent maps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::AuthError;
use super::store::AuthStore;
use crate::models::auth::{
    NewRefreshToken, NewUser, ProfileUpdate, RefreshTokenRecord, User, UserWithPassword,
};
use crate::uuid::uuidv7;

#[derive(Default)]
pub struct MemoryAuthStore {
    users: DashMap<Uuid, UserWithPassword>,
    usernames: DashMap<String, Uuid>,
    /// Keyed by token hash.
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored refresh token records, revoked ones included.
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    fn email_in_use(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.user.email.as_deref() == Some(email) && Some(u.user.id) != except)
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
        if let Some(email) = &user.email
            && self.email_in_use(email, None)
        {
            return Err(AuthError::Conflict("email already exists".into()));
        }
        let Entry::Vacant(slot) = self.usernames.entry(user.username.clone()) else {
            return Err(AuthError::Conflict("username already exists".into()));
        };
        let now = Utc::now();
        let created = User {
            id: uuidv7(),
            username: user.username,
            email: user.email,
            user_type: user.user_type,
            created_at: now,
            updated_at: now,
        };
        slot.insert(created.id);
        self.users.insert(
            created.id,
            UserWithPassword {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserWithPassword>, AuthError> {
        let Some(id) = self.usernames.get(username).map(|r| *r) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&user_id).map(|u| u.user.clone()))
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AuthError> {
        Ok(self.email_in_use(email, except))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        if let Some(email) = &update.email
            && self.email_in_use(email, Some(user_id))
        {
            return Err(AuthError::Conflict("email already exists".into()));
        }
        let Some(mut entry) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(email) = update.email {
            entry.user.email = Some(email);
        }
        if let Some(user_type) = update.user_type {
            entry.user.user_type = user_type;
        }
        entry.user.updated_at = Utc::now();
        Ok(Some(entry.user.clone()))
    }

    async fn insert_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> Result<RefreshTokenRecord, AuthError> {
        let Entry::Vacant(slot) = self.refresh_tokens.entry(token.token_hash.clone()) else {
            return Err(AuthError::Conflict("refresh token already exists".into()));
        };
        let record = RefreshTokenRecord {
            id: uuidv7(),
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: Utc::now(),
            is_revoked: false,
            revoked_at: None,
            user_agent: token.client.user_agent,
            ip_address: token.client.ip_address,
        };
        slot.insert(record.clone());
        Ok(record)
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        Ok(self.refresh_tokens.get(token_hash).map(|r| r.clone()))
    }

    async fn consume_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>, AuthError> {
        // get_mut holds the shard write lock across check and revoke.
        let Some(mut record) = self.refresh_tokens.get_mut(token_hash) else {
            return Ok(None);
        };
        if !record.is_valid_at(now) {
            return Ok(None);
        }
        record.is_revoked = true;
        record.revoked_at = Some(now);
        Ok(Some(record.clone()))
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, AuthError> {
        let Some(mut record) = self.refresh_tokens.get_mut(token_hash) else {
            return Ok(false);
        };
        if !record.is_revoked {
            record.is_revoked = true;
            record.revoked_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let now = Utc::now();
        let mut count = 0;
        for mut record in self.refresh_tokens.iter_mut() {
            if record.user_id == user_id && !record.is_revoked {
                record.is_revoked = true;
                record.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        let mut active: Vec<RefreshTokenRecord> = self
            .refresh_tokens
            .iter()
            .filter(|r| r.user_id == user_id && r.is_valid_at(now))
            .map(|r| r.clone())
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut deleted = 0;
        self.refresh_tokens.retain(|_, r| {
            let keep = r.expires_at >= now;
            if !keep {
                deleted += 1;
            }
            keep
        });
        Ok(deleted)
    }
}
