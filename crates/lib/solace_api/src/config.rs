//! API server configuration.

use std::fmt;
use std::str::FromStr;

use solace_core::settings::{
    AuthSettings, ConfigError, DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_OPENAI_MAX_RETRIES, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_TIMEOUT_SECS,
    DEFAULT_REFRESH_TTL_DAYS, LlmSettings, MIN_KDF_ITERATIONS,
};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost:5432/solace";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Validated, immutable configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    pub auth: AuthSettings,
    pub llm: LlmSettings,
    /// Seconds between expired refresh-token sweeps.
    pub sweep_interval_secs: u64,
}

impl ApiConfig {
    /// Reads configuration from the process environment.
    ///
    /// | Variable                       | Default                            |
    /// |--------------------------------|------------------------------------|
    /// | `BIND_ADDR`                    | `127.0.0.1:8000`                   |
    /// | `DATABASE_URL`                 | `postgres://localhost:5432/solace` |
    /// | `SECRET_KEY`                   | required, at least 32 bytes        |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`  | `30` (5..=120)                     |
    /// | `REFRESH_TOKEN_EXPIRE_DAYS`    | `7` (1..=30)                       |
    /// | `PASSWORD_KDF_ITERATIONS`      | `100000` (minimum)                 |
    /// | `ENABLE_REGISTRATION`          | `true`                             |
    /// | `ENABLE_MOCK_MODE`             | `false`                            |
    /// | `OPENAI_API_KEY`               | required unless mock mode          |
    /// | `OPENAI_MODEL`                 | `gpt-4o-mini`                      |
    /// | `OPENAI_BASE_URL`              | `https://api.openai.com/v1`        |
    /// | `OPENAI_TIMEOUT`               | `60` (10..=300)                    |
    /// | `OPENAI_MAX_RETRIES`           | `3` (0..=10)                       |
    /// | `TOKEN_SWEEP_INTERVAL_SECS`    | `3600`                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let auth = AuthSettings {
            secret: get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?,
            access_ttl_minutes: parse_or(
                &get,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                DEFAULT_ACCESS_TTL_MINUTES,
            )?,
            refresh_ttl_days: parse_or(&get, "REFRESH_TOKEN_EXPIRE_DAYS", DEFAULT_REFRESH_TTL_DAYS)?,
            kdf_iterations: parse_or(&get, "PASSWORD_KDF_ITERATIONS", MIN_KDF_ITERATIONS)?,
            registration_enabled: flag_or(&get, "ENABLE_REGISTRATION", true)?,
        };
        auth.validate()?;

        let llm = LlmSettings {
            api_key: get("OPENAI_API_KEY"),
            model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            timeout_secs: parse_or(&get, "OPENAI_TIMEOUT", DEFAULT_OPENAI_TIMEOUT_SECS)?,
            max_retries: parse_or(&get, "OPENAI_MAX_RETRIES", DEFAULT_OPENAI_MAX_RETRIES)?,
            mock_mode: flag_or(&get, "ENABLE_MOCK_MODE", false)?,
        };
        llm.validate()?;

        let sweep_interval_secs =
            parse_or(&get, "TOKEN_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "TOKEN_SWEEP_INTERVAL_SECS",
                "must be greater than 0",
            ));
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            auth,
            llm,
            sweep_interval_secs,
        })
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &"***")
            .field("auth", &self.auth)
            .field("llm", &self.llm)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, e.to_string())),
    }
}

fn flag_or(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(name, format!("not a boolean: {v}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn minimal_mock_config_loads_defaults() {
        let c = load(&[("SECRET_KEY", SECRET), ("ENABLE_MOCK_MODE", "true")]).unwrap();
        assert_eq!(c.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(c.auth.access_ttl_minutes, 30);
        assert_eq!(c.auth.refresh_ttl_days, 7);
        assert!(c.auth.registration_enabled);
        assert!(c.llm.mock_mode);
        assert_eq!(c.llm.model, "gpt-4o-mini");
        assert_eq!(c.sweep_interval_secs, 3600);
    }

    #[test]
    fn missing_secret_is_fatal() {
        assert!(matches!(
            load(&[("ENABLE_MOCK_MODE", "true")]),
            Err(ConfigError::Missing("SECRET_KEY"))
        ));
    }

    #[test]
    fn missing_api_key_outside_mock_mode_is_fatal() {
        assert!(matches!(
            load(&[("SECRET_KEY", SECRET)]),
            Err(ConfigError::Missing("OPENAI_API_KEY"))
        ));
        load(&[
            ("SECRET_KEY", SECRET),
            ("OPENAI_API_KEY", "sk-live-0123456789abcdefghij"),
        ])
        .unwrap();
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = load(&[
            ("SECRET_KEY", SECRET),
            ("ENABLE_MOCK_MODE", "1"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_ttl_is_rejected() {
        assert!(
            load(&[
                ("SECRET_KEY", SECRET),
                ("ENABLE_MOCK_MODE", "1"),
                ("REFRESH_TOKEN_EXPIRE_DAYS", "90"),
            ])
            .is_err()
        );
    }

    #[test]
    fn bad_boolean_is_rejected() {
        assert!(load(&[("SECRET_KEY", SECRET), ("ENABLE_MOCK_MODE", "maybe")]).is_err());
    }

    #[test]
    fn debug_hides_database_url() {
        let c = load(&[
            ("SECRET_KEY", SECRET),
            ("ENABLE_MOCK_MODE", "true"),
            ("DATABASE_URL", "postgres://user:hunter2@db/solace"),
        ])
        .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains(SECRET));
    }
}
