//! Runtime configuration from the environment (and `.env`).

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::services::sku::DEFAULT_MAX_ATTEMPTS;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_ttl: Duration,
    pub sku_max_attempts: u32,
    pub currency: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let ttl_minutes: u64 = parse_or(&lookup, "SESSION_TTL_MINUTES", 60)?;
        let ttl_secs = ttl_minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid { name: "SESSION_TTL_MINUTES", value: ttl_minutes.to_string() })?;
        let currency = lookup("CURRENCY").unwrap_or_else(|| "GBP".to_string()).trim().to_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid { name: "CURRENCY", value: currency });
        }
        Ok(Self {
            database_url,
            port: parse_or(&lookup, "PORT", 8083)?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            session_ttl: Duration::from_secs(ttl_secs),
            sku_max_attempts: positive(parse_or(&lookup, "SKU_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?, "SKU_MAX_ATTEMPTS")?,
            currency,
        })
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn positive(value: u32, name: &'static str) -> Result<u32, ConfigError> {
    if value == 0 { Err(ConfigError::Invalid { name, value: value.to_string() }) } else { Ok(value) }
}
