use std::path::PathBuf;

use thiserror::Error;

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 5000;
pub const MAX_UPLOAD_BYTES: usize = 10 << 20;
pub const MAX_JSON_BYTES: usize = 1 << 20;

pub const DEFAULT_TOKEN_EXPIRATION_HOURS: i64 = 72;
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

const DEV_JWT_SECRET: &str = "marquee-development-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Mongo,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MARQUEE_JWT_SECRET must be set in release builds")]
    MissingJwtSecret,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub store: StoreKind,
    pub mongo_uri: String,
    pub database: String,
    pub jwt_secret: String,
    /// Set when no secret was configured and the development fallback is in use.
    pub jwt_secret_is_default: bool,
    pub token_expiration_hours: i64,
    pub upload_root: PathBuf,
    pub rate_limit_per_minute: u32,
    pub seed_demo: bool,
}

impl Config {
    /// Reads the process environment. Only debug builds may run without a JWT secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        let (jwt_secret, jwt_secret_is_default) =
            resolve_jwt_secret(env_string("MARQUEE_JWT_SECRET"), cfg!(debug_assertions))?;

        Ok(Self {
            bind: env_string("MARQUEE_BIND").unwrap_or_else(|| "127.0.0.1:4000".to_string()),
            store: match env_string("MARQUEE_STORE").as_deref() {
                Some("mongo") | Some("mongodb") => StoreKind::Mongo,
                _ => StoreKind::Memory,
            },
            mongo_uri: env_string("MARQUEE_MONGO_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database: env_string("MARQUEE_DATABASE").unwrap_or_else(|| "eventdb".to_string()),
            jwt_secret,
            jwt_secret_is_default,
            token_expiration_hours: token_expiration_hours(),
            upload_root: env_string("MARQUEE_UPLOAD_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            rate_limit_per_minute: env_string("MARQUEE_RATE_LIMIT_PER_MINUTE")
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
            seed_demo: env_string("MARQUEE_SEED_DEMO")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    /// Configuration used by tests: in-memory store, fixed secret, generous gate.
    pub fn for_tests(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            bind: "127.0.0.1:0".to_string(),
            store: StoreKind::Memory,
            mongo_uri: String::new(),
            database: "eventdb_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_secret_is_default: false,
            token_expiration_hours: DEFAULT_TOKEN_EXPIRATION_HOURS,
            upload_root: upload_root.into(),
            rate_limit_per_minute: 10_000,
            seed_demo: false,
        }
    }
}

/// Returns the secret and whether it is the development fallback.
fn resolve_jwt_secret(configured: Option<String>, allow_dev_fallback: bool) -> Result<(String, bool), ConfigError> {
    match configured.filter(|s| !s.is_empty()) {
        Some(secret) => Ok((secret, false)),
        None if allow_dev_fallback => Ok((DEV_JWT_SECRET.to_string(), true)),
        None => Err(ConfigError::MissingJwtSecret),
    }
}

pub fn token_expiration_hours() -> i64 {
    std::env::var("MARQUEE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_TOKEN_EXPIRATION_HOURS)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_secret_is_used_as_is() {
        let resolved = resolve_jwt_secret(Some("s3cret".to_string()), false).unwrap();
        assert_eq!(resolved, ("s3cret".to_string(), false));
    }

    #[test]
    fn missing_secret_falls_back_only_in_development() {
        let (secret, is_default) = resolve_jwt_secret(None, true).unwrap();
        assert_eq!(secret, DEV_JWT_SECRET);
        assert!(is_default);

        assert_eq!(resolve_jwt_secret(None, false), Err(ConfigError::MissingJwtSecret));
        assert_eq!(resolve_jwt_secret(Some(String::new()), false), Err(ConfigError::MissingJwtSecret));
    }
}
