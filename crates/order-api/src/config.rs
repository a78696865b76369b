//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use placement::{CircuitBreakerConfig, ResilienceConfig};
use thiserror::Error;

/// A variable was set but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:8081`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `json` for JSON lines
/// - `INVENTORY_URL`: inventory service base URL (default `http://localhost:8082`)
/// - `DATABASE_URL`: PostgreSQL URL; in-memory storage when unset
/// - `INVENTORY_TIMEOUT_MS`, `INVENTORY_MAX_RETRIES`, `INVENTORY_RETRY_BACKOFF_MS`
/// - `BREAKER_WINDOW_SIZE`, `BREAKER_MINIMUM_CALLS`, `BREAKER_FAILURE_RATIO`,
///   `BREAKER_COOLDOWN_MS`, `BREAKER_HALF_OPEN_CALLS`
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    pub inventory_url: String,
    pub database_url: Option<String>,
    pub resilience: ResilienceConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &'static str| -> Result<Option<u64>, ConfigError> {
            parse_var(&lookup, key)
        };

        let retry = defaults.resilience.retry;
        let breaker = defaults.resilience.breaker;
        let resilience = ResilienceConfig::default()
            .with_timeout(
                parse("INVENTORY_TIMEOUT_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.resilience.timeout.per_attempt),
            )
            .with_retry(
                parse_var(&lookup, "INVENTORY_MAX_RETRIES")?.unwrap_or(retry.max_retries),
                parse("INVENTORY_RETRY_BACKOFF_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(retry.backoff),
            )
            .with_breaker(CircuitBreakerConfig {
                window_size: parse_var(&lookup, "BREAKER_WINDOW_SIZE")?
                    .unwrap_or(breaker.window_size),
                minimum_calls: parse_var(&lookup, "BREAKER_MINIMUM_CALLS")?
                    .unwrap_or(breaker.minimum_calls),
                failure_ratio: parse_var(&lookup, "BREAKER_FAILURE_RATIO")?
                    .unwrap_or(breaker.failure_ratio),
                cooldown: parse("BREAKER_COOLDOWN_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(breaker.cooldown),
                half_open_calls: parse_var(&lookup, "BREAKER_HALF_OPEN_CALLS")?
                    .unwrap_or(breaker.half_open_calls),
            });

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            inventory_url: lookup("INVENTORY_URL").unwrap_or(defaults.inventory_url),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            resilience,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { key, value }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            log_level: "info".to_string(),
            json_logs: false,
            inventory_url: "http://localhost:8082".to_string(),
            database_url: None,
            resilience: ResilienceConfig::default(),
        }
    }
}
