// src/common/config.rs
//! Process configuration, read once at startup from the environment

use chrono::Duration;
use std::env;
use thiserror::Error;
use tracing::warn;

/// Below this many bytes the signing key is accepted but flagged
const RECOMMENDED_SECRET_LEN: usize = 32;

/// Ten years; longer lifetimes are rejected at startup
const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SECRET_KEY must be set to a non-empty value")]
    MissingSecret,

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be at most {max}, got '{value}'")]
    OutOfRange {
        name: &'static str,
        value: String,
        max: i64,
    },

    #[error("access token TTL ({access}h) must be shorter than refresh token TTL ({refresh}h)")]
    TtlOrdering { access: i64, refresh: i64 },
}

/// Argon2 cost parameters for password hashing
#[derive(Debug, Clone)]
pub struct PasswordHashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Google OAuth client settings
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub secret_key: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub database_url: String,
    pub port: u16,
    pub store_timeout: std::time::Duration,
    pub cors_origins: Vec<String>,
    pub password_hash: PasswordHashConfig,
    pub google: Option<GoogleOAuthConfig>,
    pub frontend_callback_url: String,
    pub frontend_signup_url: String,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any name -> value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        if secret_key.len() < RECOMMENDED_SECRET_LEN {
            warn!(
                length = secret_key.len(),
                recommended = RECOMMENDED_SECRET_LEN,
                "SECRET_KEY is shorter than recommended"
            );
        }

        let access_hours = parse_ttl_hours(&lookup, "ACCESS_TOKEN_TTL_HOURS", 120)?;
        let refresh_hours = parse_ttl_hours(&lookup, "REFRESH_TOKEN_TTL_HOURS", 172)?;
        if access_hours >= refresh_hours {
            return Err(ConfigError::TtlOrdering {
                access: access_hours,
                refresh: refresh_hours,
            });
        }

        let port = parse_positive(&lookup, "PORT", 8000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidNumber {
            name: "PORT",
            value: port.to_string(),
        })?;

        let store_timeout_secs = parse_positive(&lookup, "STORE_TIMEOUT_SECS", 100)?;

        let defaults = PasswordHashConfig::default();
        let password_hash = PasswordHashConfig {
            memory_kib: parse_u32(&lookup, "PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_u32(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_u32(&lookup, "PASSWORD_HASH_PARALLELISM", defaults.parallelism)?,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://localhost:8000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let google = match (
            lookup("GOOGLE_CLIENT_ID"),
            lookup("GOOGLE_CLIENT_SECRET"),
            lookup("GOOGLE_CALLBACK_URL"),
        ) {
            (Some(client_id), Some(client_secret), Some(callback_url))
                if !client_id.is_empty() && !client_secret.is_empty() =>
            {
                Some(GoogleOAuthConfig {
                    client_id,
                    client_secret,
                    callback_url,
                })
            }
            _ => None,
        };

        Ok(Self {
            secret_key,
            access_ttl: Duration::hours(access_hours),
            refresh_ttl: Duration::hours(refresh_hours),
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://tokengate.db".to_string()),
            port,
            store_timeout: std::time::Duration::from_secs(store_timeout_secs as u64),
            cors_origins,
            password_hash,
            google,
            frontend_callback_url: lookup("FRONTEND_CALLBACK_URL")
                .unwrap_or_else(|| "http://localhost:3000/auth/callback".to_string()),
            frontend_signup_url: lookup("FRONTEND_SIGNUP_URL")
                .unwrap_or_else(|| "http://localhost:3000/signup".to_string()),
        })
    }
}

fn parse_positive<F>(lookup: &F, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber { name, value: raw }),
        },
    }
}

fn parse_ttl_hours<F>(lookup: &F, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let hours = parse_positive(lookup, name, default)?;
    if hours > MAX_TTL_HOURS {
        return Err(ConfigError::OutOfRange {
            name,
            value: hours.to_string(),
            max: MAX_TTL_HOURS,
        });
    }
    Ok(hours)
}

fn parse_u32<F>(lookup: &F, name: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_positive(lookup, name, i64::from(default))?;
    u32::try_from(value).map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_secret_is_a_startup_error() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));

        let result = AppConfig::from_lookup(lookup_from(&[("SECRET_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
    }

    #[test]
    fn test_defaults_follow_observed_policy() {
        let config = AppConfig::from_lookup(lookup_from(&[(
            "SECRET_KEY",
            "0123456789abcdef0123456789abcdef",
        )]))
        .unwrap();

        assert_eq!(config.access_ttl, Duration::hours(120));
        assert_eq!(config.refresh_ttl, Duration::hours(172));
        assert_eq!(config.port, 8000);
        assert_eq!(config.store_timeout, std::time::Duration::from_secs(100));
        assert!(config.google.is_none());
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_access_ttl_must_be_shorter_than_refresh_ttl() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("ACCESS_TOKEN_TTL_HOURS", "200"),
            ("REFRESH_TOKEN_TTL_HOURS", "100"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::TtlOrdering {
                access: 200,
                refresh: 100
            })
        ));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("PORT", "not-a-port"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { name: "PORT", .. })
        ));
    }

    #[test]
    fn test_google_requires_all_three_settings() {
        let partial = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("GOOGLE_CLIENT_ID", "id"),
        ]))
        .unwrap();
        assert!(partial.google.is_none());

        let full = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("GOOGLE_CLIENT_ID", "id"),
            ("GOOGLE_CLIENT_SECRET", "shh"),
            ("GOOGLE_CALLBACK_URL", "http://localhost:8000/auth/google/callback"),
        ]))
        .unwrap();
        assert_eq!(full.google.unwrap().client_id, "id");
    }

    #[test]
    fn test_ttl_beyond_ten_years_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("ACCESS_TOKEN_TTL_HOURS", "10000000000"),
            ("REFRESH_TOKEN_TTL_HOURS", "20000000000"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange {
                name: "ACCESS_TOKEN_TTL_HOURS",
                max: MAX_TTL_HOURS,
                ..
            })
        ));

        let at_limit = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("ACCESS_TOKEN_TTL_HOURS", "24"),
            ("REFRESH_TOKEN_TTL_HOURS", "87600"),
        ]))
        .unwrap();
        assert_eq!(at_limit.refresh_ttl, Duration::hours(MAX_TTL_HOURS));
    }

    #[test]
    fn test_hash_cost_beyond_u32_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("SECRET_KEY", "secret"),
            ("PASSWORD_HASH_ITERATIONS", "4294967297"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber {
                name: "PASSWORD_HASH_ITERATIONS",
                ..
            })
        ));
    }
}
