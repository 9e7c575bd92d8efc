//! Validated, immutable runtime settings.
//!
//! Loaded once at startup (see `solace_api::config`) and passed explicitly to
//! the components that need them. Any violation here is fatal.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Minimum accepted PBKDF2 iteration count.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_OPENAI_MAX_RETRIES: u32 = 3;

const PLACEHOLDER_SECRETS: &[&str] = &["your_generated_secret_key_here", "changeme"];
const PLACEHOLDER_API_KEYS: &[&str] = &[
    "your_openai_api_key_here",
    "sk-proj-...",
    "sk-mock-key-for-testing",
];

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            name,
            reason: reason.into(),
        }
    }
}

fn check_range<T: PartialOrd + fmt::Display>(
    name: &'static str,
    value: T,
    min: T,
    max: T,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::invalid(
            name,
            format!("{value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}

/// Token and credential settings.
#[derive(Clone)]
pub struct AuthSettings {
    /// HS256 signing secret.
    pub secret: String,
    /// 5..=120 minutes.
    pub access_ttl_minutes: i64,
    /// 1..=30 days.
    pub refresh_ttl_days: i64,
    pub kdf_iterations: u32,
    pub registration_enabled: bool,
}

impl AuthSettings {
    /// Settings with defaults for everything but the secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_minutes: DEFAULT_ACCESS_TTL_MINUTES,
            refresh_ttl_days: DEFAULT_REFRESH_TTL_DAYS,
            kdf_iterations: MIN_KDF_ITERATIONS,
            registration_enabled: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Missing("SECRET_KEY"));
        }
        if PLACEHOLDER_SECRETS.contains(&self.secret.as_str()) {
            return Err(ConfigError::invalid(
                "SECRET_KEY",
                "must be changed from the placeholder value",
            ));
        }
        if self.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "SECRET_KEY",
                format!(
                    "too short ({} bytes), need at least {MIN_SECRET_LEN}",
                    self.secret.len()
                ),
            ));
        }
        check_range(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            self.access_ttl_minutes,
            5,
            120,
        )?;
        check_range("REFRESH_TOKEN_EXPIRE_DAYS", self.refresh_ttl_days, 1, 30)?;
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(ConfigError::invalid(
                "PASSWORD_KDF_ITERATIONS",
                format!("need at least {MIN_KDF_ITERATIONS}"),
            ));
        }
        Ok(())
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_ttl_days)
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"***")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("registration_enabled", &self.registration_enabled)
            .finish()
    }
}

/// Language-model provider settings.
#[derive(Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// 10..=300 seconds.
    pub timeout_secs: u64,
    /// 0..=10.
    pub max_retries: u32,
    /// Answer locally instead of calling the provider.
    pub mock_mode: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout_secs: DEFAULT_OPENAI_TIMEOUT_SECS,
            max_retries: DEFAULT_OPENAI_MAX_RETRIES,
            mock_mode: false,
        }
    }
}

impl LlmSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("OPENAI_TIMEOUT", self.timeout_secs, 10, 300)?;
        check_range("OPENAI_MAX_RETRIES", self.max_retries, 0, 10)?;
        if self.mock_mode {
            return Ok(());
        }
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        if PLACEHOLDER_API_KEYS.contains(&key) {
            return Err(ConfigError::invalid(
                "OPENAI_API_KEY",
                "must be set to a real key (or set ENABLE_MOCK_MODE=true)",
            ));
        }
        if key.len() < 20 {
            return Err(ConfigError::invalid("OPENAI_API_KEY", "too short"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("mock_mode", &self.mock_mode)
            .finish()
    }
}
