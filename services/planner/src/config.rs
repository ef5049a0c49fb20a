//! services/planner/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::FixedOffset;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;
use trip_planner_core::form::DEFAULT_BOOKING_HORIZON_DAYS;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub trip_api_url: String,
    pub database_url: String,
    pub log_level: Level,
    /// The users' timezone; trip days start at midnight in this offset.
    pub utc_offset: FixedOffset,
    /// How many days after today the calendar accepts.
    pub booking_horizon_days: u32,
    pub http_timeout: Duration,
    pub cors_origin: String,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Storage Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://./data/planner.db".to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:8081".to_string());

        // --- Remote Trip Service ---
        let trip_api_url = lookup("TRIP_API_URL")
            .ok_or_else(|| ConfigError::MissingVar("TRIP_API_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let timeout_str = lookup("HTTP_TIMEOUT_SECS").unwrap_or_else(|| "10".to_string());
        let http_timeout = timeout_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidValue("HTTP_TIMEOUT_SECS".to_string(), e.to_string()))?;

        // --- Dates ---
        let offset_str = lookup("TRIP_UTC_OFFSET").unwrap_or_else(|| "+00:00".to_string());
        let utc_offset = offset_str.parse::<FixedOffset>().map_err(|e| {
            ConfigError::InvalidValue("TRIP_UTC_OFFSET".to_string(), e.to_string())
        })?;

        let booking_horizon_days = match lookup("BOOKING_HORIZON_DAYS") {
            Some(value) => value.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("BOOKING_HORIZON_DAYS".to_string(), e.to_string())
            })?,
            None => DEFAULT_BOOKING_HORIZON_DAYS,
        };

        Ok(Self {
            bind_address,
            trip_api_url,
            database_url,
            log_level,
            utc_offset,
            booking_horizon_days,
            http_timeout,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn applies_defaults() {
        let config = config_from(&[("TRIP_API_URL", "http://trips.local:3333/")]).expect("config");

        assert_eq!(config.bind_address, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.trip_api_url, "http://trips.local:3333");
        assert_eq!(config.database_url, "sqlite://./data/planner.db");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.booking_horizon_days, DEFAULT_BOOKING_HORIZON_DAYS);
    }

    #[test]
    fn reads_booking_horizon() {
        let config = config_from(&[
            ("TRIP_API_URL", "http://trips.local"),
            ("BOOKING_HORIZON_DAYS", "90"),
        ])
        .expect("config");
        assert_eq!(config.booking_horizon_days, 90);

        let bad = config_from(&[("TRIP_API_URL", "http://t"), ("BOOKING_HORIZON_DAYS", "forever")]);
        assert!(matches!(bad, Err(ConfigError::InvalidValue(var, _)) if var == "BOOKING_HORIZON_DAYS"));
    }

    #[test]
    fn requires_trip_api_url() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "TRIP_API_URL"));
    }

    #[test]
    fn parses_negative_utc_offset() {
        let config = config_from(&[
            ("TRIP_API_URL", "http://trips.local"),
            ("TRIP_UTC_OFFSET", "-03:00"),
        ])
        .expect("config");

        assert_eq!(config.utc_offset.local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_level = config_from(&[("TRIP_API_URL", "http://t"), ("RUST_LOG", "loud")]);
        assert!(matches!(bad_level, Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"));

        let bad_offset = config_from(&[("TRIP_API_URL", "http://t"), ("TRIP_UTC_OFFSET", "BRT")]);
        assert!(
            matches!(bad_offset, Err(ConfigError::InvalidValue(var, _)) if var == "TRIP_UTC_OFFSET")
        );

        let bad_timeout = config_from(&[("TRIP_API_URL", "http://t"), ("HTTP_TIMEOUT_SECS", "-1")]);
        assert!(bad_timeout.is_err());
    }
}
