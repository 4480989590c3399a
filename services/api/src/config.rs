//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{Duration, FixedOffset, Offset, Utc};
use std::net::SocketAddr;
use study_tracker_core::time::parse_utc_offset;
use study_tracker_core::AuthSettings;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which deployment the server runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    /// Sign-in links are echoed back in the response for local testing.
    Development,
    Production,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub app_env: AppEnv,
    pub base_url: String,
    pub cors_origin: String,
    /// Reference timezone for calendar days.
    pub utc_offset: FixedOffset,
    pub magic_link_ttl: Duration,
    pub session_ttl: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Application Settings ---
        let app_env = match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "production".to_string())
            .to_lowercase()
            .as_str()
        {
            "development" | "dev" => AppEnv::Development,
            "production" | "prod" => AppEnv::Production,
            other => {
                return Err(ConfigError::InvalidValue(
                    "APP_ENV".to_string(),
                    format!("'{}' is neither development nor production", other),
                ))
            }
        };

        let base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let utc_offset_str = std::env::var("UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string());
        let utc_offset = parse_utc_offset(&utc_offset_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "UTC_OFFSET".to_string(),
                format!("'{}' is not an offset like +09:00", utc_offset_str),
            )
        })?;

        let magic_link_ttl = Duration::minutes(positive_number("MAGIC_LINK_TTL_MINUTES", 15)?);
        let session_ttl = Duration::days(positive_number("SESSION_TTL_DAYS", 7)?);

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            app_env,
            base_url,
            cors_origin,
            utc_offset,
            magic_link_ttl,
            session_ttl,
        })
    }

    /// A configuration for tests that never reads the environment.
    pub fn test_default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: "postgres://localhost/study_tracker_test".to_string(),
            log_level: Level::DEBUG,
            app_env: AppEnv::Development,
            base_url: "http://localhost:3000".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            utc_offset: Utc.fix(),
            magic_link_ttl: Duration::minutes(15),
            session_ttl: Duration::days(7),
        }
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            base_url: self.base_url.clone(),
            magic_link_ttl: self.magic_link_ttl,
            session_ttl: self.session_ttl,
        }
    }
}

fn positive_number(var: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidValue(
                var.to_string(),
                format!("'{}' is not a positive whole number", raw),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_development_in_utc() {
        let config = Config::test_default();
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.auth_settings().session_ttl, Duration::days(7));
    }
}
