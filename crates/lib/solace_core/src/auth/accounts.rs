//! Account registration and profile management.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::AuthError;
use super::session::SessionManager;
use crate::models::auth::{NewUser, ProfileUpdate, RefreshTokenRecord, User, UserType};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=50;
const EMAIL_MAX_LEN: usize = 254;

/// Registration request after transport decoding.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub user_type: Option<UserType>,
}

pub struct AccountService {
    sessions: Arc<SessionManager>,
    registration_enabled: bool,
}

impl AccountService {
    pub fn new(sessions: Arc<SessionManager>, registration_enabled: bool) -> Self {
        Self {
            sessions,
            registration_enabled,
        }
    }

    pub async fn register(&self, reg: Registration) -> Result<User, AuthError> {
        if !self.registration_enabled {
            return Err(AuthError::RegistrationDisabled);
        }
        let username = validate_username(&reg.username)?;
        let email = reg.email.as_deref().map(normalize_email).transpose()?;
        validate_password(&reg.password)?;

        let store = self.sessions.store();
        if let Some(email) = &email
            && store.email_taken(email, None).await?
        {
            return Err(AuthError::Conflict("Email already registered".into()));
        }
        if store.find_user_by_username(&username).await?.is_some() {
            return Err(AuthError::Conflict("Username already registered".into()));
        }

        let password_hash = self.sessions.hash_password(&reg.password).await?;
        let user = store
            .create_user(NewUser {
                username,
                email,
                password_hash,
                user_type: reg.user_type.unwrap_or_default(),
            })
            .await?;
        info!(user_id = %user.id, user_type = %user.user_type, "user registered");
        Ok(user)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.sessions
            .store()
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let email = update.email.as_deref().map(normalize_email).transpose()?;
        let store = self.sessions.store();
        if let Some(email) = &email
            && store.email_taken(email, Some(user_id)).await?
        {
            return Err(AuthError::Conflict("Email already registered".into()));
        }
        store
            .update_profile(
                user_id,
                ProfileUpdate {
                    email,
                    user_type: update.user_type,
                },
            )
            .await?
            .ok_or_else(|| AuthError::NotFound("User not found".into()))
    }

    /// Active refresh records for a user, newest first.
    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        self.sessions
            .store()
            .list_active_for_user(user_id, Utc::now())
            .await
    }
}

/// Trimmed username of 3..=50 ASCII letters, digits, or underscores.
pub fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if !USERNAME_LEN.contains(&username.len()) {
        return Err(AuthError::Validation(
            "Username must be 3-50 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AuthError::Validation(
            "Username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(username.to_string())
}

/// Lowercased, trimmed email of the shape `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    let invalid = || AuthError::Validation("Invalid email address".into());
    if email.len() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.is_empty() {
        return Err(invalid());
    }
    Ok(email)
}

/// 6..=50 characters with at least one letter and one digit.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if !PASSWORD_LEN.contains(&password.chars().count()) {
        return Err(AuthError::Validation(
            "Password must be 6-50 characters".into(),
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(AuthError::Validation(
            "Password must contain at least one letter and one digit".into(),
        ));
    }
    Ok(())
}
