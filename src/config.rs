use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use dotenvy::dotenv;

use crate::engine::geotime::parse_shift_time;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Upper bound for a single repository call.
    pub store_timeout: Duration,
    /// After this wall time today's missing staff are reported absent.
    pub absent_cutoff: NaiveTime,

    pub log_dir: String,
    pub log_level: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let raw_cutoff = env::var("ABSENT_CUTOFF").unwrap_or_else(|_| "17:00".to_string());
        let absent_cutoff = parse_shift_time(raw_cutoff.trim())
            .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
            .with_context(|| format!("ABSENT_CUTOFF must be HH:MM, got {raw_cutoff}"))?;

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            store_timeout: Duration::from_millis(parsed_or("STORE_TIMEOUT_MS", 5000)?),
            absent_cutoff,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "debug".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.rate_login_per_min > 0, "RATE_LOGIN_PER_MIN must be at least 1");
        anyhow::ensure!(self.rate_protected_per_min > 0, "RATE_PROTECTED_PER_MIN must be at least 1");
        anyhow::ensure!(!self.store_timeout.is_zero(), "STORE_TIMEOUT_MS must be positive");
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 900,
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".into(),
            store_timeout: Duration::from_secs(1),
            absent_cutoff: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            log_dir: "logs".into(),
            log_level: "debug".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn zero_rates_and_timeout_are_rejected() {
        let mut config = Config::for_tests();
        config.rate_protected_per_min = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RATE_PROTECTED_PER_MIN"));

        let mut config = Config::for_tests();
        config.store_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
