//! JWT access token issuing and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::AuthError;
use crate::models::auth::AccessClaims;
use crate::settings::AuthSettings;

/// Value of the `type` claim on access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "access";

/// Signs and validates HS256 access tokens with the server secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.secret.as_bytes(), settings.access_ttl())
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Issue an access token with the configured lifetime.
    pub fn issue_access(&self, user_id: &str, username: &str) -> Result<String, AuthError> {
        self.issue_access_with_ttl(user_id, username, self.access_ttl)
    }

    /// Issue an access token with an explicit lifetime.
    pub fn issue_access_with_ttl(
        &self,
        user_id: &str,
        username: &str,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: username.to_string(),
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;
        debug!(user = username, exp = claims.exp, "access token issued");
        Ok(token)
    }

    /// Validate signature, expiry, and the `type` tag.
    ///
    /// Every failure collapses to `None`; the reason is only logged.
    pub fn validate_access(&self, token: &str) -> Option<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        let claims = match decode::<AccessClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(reason = %e, "access token rejected");
                return None;
            }
        };
        if claims.token_type != ACCESS_TOKEN_TYPE {
            debug!(token_type = %claims.token_type, "access token rejected: wrong type");
            return None;
        }
        Some(claims)
    }
}
