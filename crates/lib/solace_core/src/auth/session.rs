//! Session lifecycle: login, refresh rotation, logout, revocation, sweeping.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AuthError;
use super::jwt::TokenIssuer;
use super::password::PasswordHasher;
use super::refresh::{generate_refresh_token, hash_refresh_token};
use super::store::AuthStore;
use crate::models::auth::{AccessClaims, ClientMeta, NewRefreshToken, TokenPair, User};
use crate::settings::AuthSettings;

/// Orchestrates credential checks and the refresh-token state machine.
///
/// A refresh record is `active` until it is revoked (logout, rotation,
/// revoke-all) or its expiry passes. Neither terminal state leads back to
/// `active`.
pub struct SessionManager {
    store: Arc<dyn AuthStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    refresh_ttl: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn AuthStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            issuer,
            refresh_ttl,
        }
    }

    pub fn from_settings(store: Arc<dyn AuthStore>, settings: &AuthSettings) -> Self {
        Self::new(
            store,
            PasswordHasher::new(settings.kdf_iterations),
            TokenIssuer::from_settings(settings),
            settings.refresh_ttl(),
        )
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    /// Hash a password off the async runtime.
    pub async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hash task failed: {e}")))
    }

    /// Verify off the async runtime. With no stored hash the dummy hash is
    /// checked instead so the cost matches a wrong password.
    async fn verify_password(
        &self,
        password: &str,
        stored: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verify task failed: {e}")))
    }

    /// Verify credentials and issue a fresh token pair.
    ///
    /// Unknown username and wrong password are indistinguishable, both in
    /// the error returned and in the time taken.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientMeta,
    ) -> Result<TokenPair, AuthError> {
        let found = self.store.find_user_by_username(username).await?;
        let (user, stored) = match found {
            Some(u) => (Some(u.user), Some(u.password_hash)),
            None => (None, None),
        };

        let verified = self.verify_password(password, stored).await?;
        let user = match user {
            Some(user) if verified => user,
            _ => {
                debug!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let pair = self.issue_pair(user, client).await?;
        info!(user_id = %pair.user.id, "login succeeded");
        Ok(pair)
    }

    /// Mint an access token and persist a new refresh record for `user`.
    pub async fn issue_pair(&self, user: User, client: ClientMeta) -> Result<TokenPair, AuthError> {
        let access_token = self
            .issuer
            .issue_access(&user.id.to_string(), &user.username)?;
        let refresh_token = generate_refresh_token();
        self.store
            .insert_refresh_token(NewRefreshToken {
                user_id: user.id,
                token_hash: hash_refresh_token(&refresh_token),
                expires_at: Utc::now() + self.refresh_ttl,
                client,
            })
            .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.issuer.access_ttl_secs(),
            refresh_expires_in: self.refresh_ttl.num_seconds(),
            user,
        })
    }

    /// Exchange a refresh token for a new pair, revoking the old record.
    ///
    /// Absent, expired, revoked, and already-consumed tokens all fail with
    /// `InvalidToken`. Of concurrent calls with the same token at most one
    /// succeeds.
    pub async fn refresh(&self, token: &str, client: ClientMeta) -> Result<TokenPair, AuthError> {
        let token_hash = hash_refresh_token(token);
        let now = Utc::now();

        let Some(consumed) = self.store.consume_refresh_token(&token_hash, now).await? else {
            if let Some(existing) = self.store.find_refresh_token(&token_hash).await?
                && existing.is_revoked
            {
                warn!(
                    target: "security",
                    event = "revoked_refresh_token_used",
                    user_id = %existing.user_id,
                    record_id = %existing.id,
                    "revoked refresh token presented"
                );
            }
            return Err(AuthError::InvalidToken);
        };

        let Some(user) = self.store.find_user_by_id(consumed.user_id).await? else {
            return Err(AuthError::InvalidToken);
        };

        let client = ClientMeta {
            user_agent: client.user_agent.or(consumed.user_agent),
            ip_address: client.ip_address.or(consumed.ip_address),
        };
        let pair = self.issue_pair(user, client).await.inspect_err(|e| {
            warn!(
                target: "security",
                event = "refresh_rotation_incomplete",
                user_id = %consumed.user_id,
                record_id = %consumed.id,
                error = %e,
                "old refresh token consumed but no replacement was issued"
            );
        })?;
        debug!(user_id = %pair.user.id, rotated = %consumed.id, "refresh token rotated");
        Ok(pair)
    }

    /// Revoke the record matching `token`. Unknown or already revoked tokens
    /// are not an error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let matched = self
            .store
            .revoke_refresh_token(&hash_refresh_token(token))
            .await?;
        debug!(matched, "logout");
        Ok(())
    }

    /// Revoke every active refresh record for a user.
    pub async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let count = self.store.revoke_all_for_user(user_id).await?;
        warn!(
            target: "security",
            event = "refresh_tokens_revoked_all",
            user_id = %user_id,
            count,
            "all sessions revoked"
        );
        Ok(count)
    }

    /// Delete refresh records whose expiry is strictly in the past.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let deleted = self.store.delete_expired(Utc::now()).await?;
        if deleted > 0 {
            info!(deleted, "expired refresh tokens swept");
        }
        Ok(deleted)
    }

    /// Validate a bearer access token.
    pub fn authenticate(&self, access_token: &str) -> Option<AccessClaims> {
        self.issuer.validate_access(access_token)
    }

    /// Spawn a periodic expiry sweep. Failures are logged and the loop
    /// keeps running.
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = manager.sweep_expired().await {
                    warn!(error = %e, "refresh token sweep failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::auth::memory::MemoryAuthStore;
    use crate::models::auth::{NewUser, UserType};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    async fn manager_with(iterations: u32) -> (Arc<SessionManager>, Arc<MemoryAuthStore>) {
        let store = Arc::new(MemoryAuthStore::new());
        let manager = Arc::new(SessionManager::new(
            store.clone(),
            PasswordHasher::new(iterations),
            TokenIssuer::new(SECRET, Duration::minutes(30)),
            Duration::days(7),
        ));
        let hash = manager.hash_password("secret123").await.unwrap();
        store
            .create_user(NewUser {
                username: "alice".into(),
                email: Some("alice@example.com".into()),
                password_hash: hash,
                user_type: UserType::General,
            })
            .await
            .unwrap();
        (manager, store)
    }

    async fn manager() -> (Arc<SessionManager>, Arc<MemoryAuthStore>) {
        manager_with(1_000).await
    }

    fn client() -> ClientMeta {
        ClientMeta {
            user_agent: Some("test-agent".into()),
            ip_address: Some("10.0.0.1".into()),
        }
    }

    #[tokio::test]
    async fn login_issues_valid_pair() {
        let (m, store) = manager().await;
        let pair = m.login("alice", "secret123", client()).await.unwrap();
        let claims = m.authenticate(&pair.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_id, pair.user.id.to_string());
        assert_eq!(pair.expires_in, 30 * 60);
        assert_eq!(pair.refresh_expires_in, 7 * 24 * 3600);

        let record = store
            .find_refresh_token(&hash_refresh_token(&pair.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
        assert_ne!(record.token_hash, pair.refresh_token);
    }

    #[tokio::test]
    async fn bad_credentials_are_uniform() {
        let (m, _) = manager().await;
        let wrong_pw = m.login("alice", "nope", client()).await.unwrap_err();
        let no_user = m.login("nobody", "secret123", client()).await.unwrap_err();
        assert!(matches!(wrong_pw, AuthError::InvalidCredentials));
        assert!(matches!(no_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
    }

    #[tokio::test]
    async fn unknown_user_costs_about_as_much_as_wrong_password() {
        let (m, _) = manager_with(20_000).await;
        // Warm up both paths.
        let _ = m.login("alice", "wrong", ClientMeta::default()).await;
        let _ = m.login("ghost", "wrong", ClientMeta::default()).await;

        let trials = 8;
        let mut known = std::time::Duration::ZERO;
        let mut unknown = std::time::Duration::ZERO;
        for _ in 0..trials {
            let start = Instant::now();
            let _ = m.login("alice", "wrong", ClientMeta::default()).await;
            known += start.elapsed();
            let start = Instant::now();
            let _ = m.login("ghost", "wrong", ClientMeta::default()).await;
            unknown += start.elapsed();
        }
        let ratio = unknown.as_secs_f64() / known.as_secs_f64();
        assert!((0.5..2.0).contains(&ratio), "timing ratio {ratio}");
    }

    #[tokio::test]
    async fn refresh_rotates_and_old_token_dies() {
        let (m, store) = manager().await;
        let first = m.login("alice", "secret123", client()).await.unwrap();
        let second = m
            .refresh(&first.refresh_token, ClientMeta::default())
            .await
            .unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);
        assert!(m.authenticate(&second.access_token).is_some());

        let err = m
            .refresh(&first.refresh_token, ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let old = store
            .find_refresh_token(&hash_refresh_token(&first.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert!(old.is_revoked);

        // Client metadata carries over when the refresh request has none.
        let new = store
            .find_refresh_token(&hash_refresh_token(&second.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(new.user_agent.as_deref(), Some("test-agent"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refresh_has_one_winner() {
        let (m, _) = manager().await;
        let pair = m.login("alice", "secret123", client()).await.unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let m = Arc::clone(&m);
                let token = pair.refresh_token.clone();
                tokio::spawn(async move { m.refresh(&token, ClientMeta::default()).await })
            })
            .collect();

        let mut ok = 0;
        let mut invalid = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AuthError::InvalidToken) => invalid += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, invalid), (1, 1));
    }

    /// Delegates to a memory store but refuses new refresh records once armed.
    struct RejectingInserts {
        inner: MemoryAuthStore,
        armed: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl AuthStore for RejectingInserts {
        async fn create_user(&self, user: NewUser) -> Result<User, AuthError> {
            self.inner.create_user(user).await
        }
        async fn find_user_by_username(
            &self,
            username: &str,
        ) -> Result<Option<crate::models::auth::UserWithPassword>, AuthError> {
            self.inner.find_user_by_username(username).await
        }
        async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AuthError> {
            self.inner.find_user_by_id(user_id).await
        }
        async fn email_taken(&self, email: &str, except: Option<Uuid>) -> Result<bool, AuthError> {
            self.inner.email_taken(email, except).await
        }
        async fn update_profile(
            &self,
            user_id: Uuid,
            update: crate::models::auth::ProfileUpdate,
        ) -> Result<Option<User>, AuthError> {
            self.inner.update_profile(user_id, update).await
        }
        async fn insert_refresh_token(
            &self,
            token: NewRefreshToken,
        ) -> Result<crate::models::auth::RefreshTokenRecord, AuthError> {
            if self.armed.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AuthError::Internal("insert refused".into()));
            }
            self.inner.insert_refresh_token(token).await
        }
        async fn find_refresh_token(
            &self,
            token_hash: &str,
        ) -> Result<Option<crate::models::auth::RefreshTokenRecord>, AuthError> {
            self.inner.find_refresh_token(token_hash).await
        }
        async fn consume_refresh_token(
            &self,
            token_hash: &str,
            now: chrono::DateTime<Utc>,
        ) -> Result<Option<crate::models::auth::RefreshTokenRecord>, AuthError> {
            self.inner.consume_refresh_token(token_hash, now).await
        }
        async fn revoke_refresh_token(&self, token_hash: &str) -> Result<bool, AuthError> {
            self.inner.revoke_refresh_token(token_hash).await
        }
        async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AuthError> {
            self.inner.revoke_all_for_user(user_id).await
        }
        async fn list_active_for_user(
            &self,
            user_id: Uuid,
            now: chrono::DateTime<Utc>,
        ) -> Result<Vec<crate::models::auth::RefreshTokenRecord>, AuthError> {
            self.inner.list_active_for_user(user_id, now).await
        }
        async fn delete_expired(&self, now: chrono::DateTime<Utc>) -> Result<u64, AuthError> {
            self.inner.delete_expired(now).await
        }
    }

    #[tokio::test]
    async fn failed_reissue_surfaces_store_error() {
        let store = Arc::new(RejectingInserts {
            inner: MemoryAuthStore::new(),
            armed: std::sync::atomic::AtomicBool::new(false),
        });
        let m = SessionManager::new(
            store.clone(),
            PasswordHasher::new(1_000),
            TokenIssuer::new(SECRET, Duration::minutes(30)),
            Duration::days(7),
        );
        let hash = m.hash_password("secret123").await.unwrap();
        store
            .create_user(NewUser {
                username: "alice".into(),
                email: None,
                password_hash: hash,
                user_type: UserType::General,
            })
            .await
            .unwrap();
        let pair = m.login("alice", "secret123", client()).await.unwrap();

        store.armed.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = m
            .refresh(&pair.refresh_token, ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));

        // The old record stays consumed; the client has to log in again.
        store.armed.store(false, std::sync::atomic::Ordering::SeqCst);
        assert!(matches!(
            m.refresh(&pair.refresh_token, ClientMeta::default()).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(m.login("alice", "secret123", client()).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_invalid() {
        let (m, _) = manager().await;
        let err = m
            .refresh("not-a-real-token", ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn logout_revokes_and_is_idempotent() {
        let (m, _) = manager().await;
        let pair = m.login("alice", "secret123", client()).await.unwrap();
        m.logout(&pair.refresh_token).await.unwrap();
        m.logout(&pair.refresh_token).await.unwrap();
        m.logout("never-issued").await.unwrap();
        assert!(matches!(
            m.refresh(&pair.refresh_token, ClientMeta::default()).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn revoke_all_kills_every_session() {
        let (m, store) = manager().await;
        let a = m.login("alice", "secret123", client()).await.unwrap();
        let b = m.login("alice", "secret123", client()).await.unwrap();
        let uid = a.user.id;
        assert_eq!(m.revoke_all(uid).await.unwrap(), 2);
        for t in [&a.refresh_token, &b.refresh_token] {
            assert!(m.refresh(t, ClientMeta::default()).await.is_err());
        }
        assert!(
            store
                .list_active_for_user(uid, Utc::now())
                .await
                .unwrap()
                .is_empty()
        );
        // Access tokens stay valid until they expire.
        assert!(m.authenticate(&a.access_token).is_some());
    }

    #[tokio::test]
    async fn sweep_removes_only_past_records() {
        let (m, store) = manager().await;
        let pair = m.login("alice", "secret123", client()).await.unwrap();
        store
            .insert_refresh_token(NewRefreshToken {
                user_id: pair.user.id,
                token_hash: "expired".into(),
                expires_at: Utc::now() - Duration::minutes(1),
                client: ClientMeta::default(),
            })
            .await
            .unwrap();
        assert_eq!(m.sweep_expired().await.unwrap(), 1);
        assert_eq!(store.refresh_token_count(), 1);
        assert!(
            m.refresh(&pair.refresh_token, ClientMeta::default())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn sweeper_task_runs_and_aborts() {
        let (m, store) = manager().await;
        store
            .insert_refresh_token(NewRefreshToken {
                user_id: Uuid::new_v4(),
                token_hash: "stale".into(),
                expires_at: Utc::now() - Duration::minutes(1),
                client: ClientMeta::default(),
            })
            .await
            .unwrap();
        let handle = m.spawn_sweeper(std::time::Duration::from_secs(3600));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.abort();
        assert_eq!(store.refresh_token_count(), 0);
    }
}
