use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: Option<String>,
    pub auth_clock_skew: Duration,
    pub db_busy_timeout: Duration,
    pub search_limit: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("db_busy_timeout", &self.db_busy_timeout)
            .field("search_limit", &self.search_limit)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "ADDRBOOK_BIND_ADDR", "127.0.0.1:8080");
        let database_path =
            PathBuf::from(value_or_default(&lookup, "ADDRBOOK_DATABASE_PATH", "addrbook.db"));

        let jwt_secret = required_trimmed(&lookup, "ADDRBOOK_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Invalid(format!(
                "ADDRBOOK_JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }
        let jwt_audience = value_or_default(&lookup, "ADDRBOOK_JWT_AUDIENCE", "addrbook");
        let jwt_issuer = optional_trimmed(&lookup, "ADDRBOOK_JWT_ISSUER");

        let auth_clock_skew_secs: u64 =
            bounded(&lookup, "AUTH_CLOCK_SKEW_SECS", "60", 0, 300)?;
        let db_busy_timeout_secs: u64 =
            bounded(&lookup, "ADDRBOOK_DB_BUSY_TIMEOUT_SECS", "5", 1, 60)?;
        let search_limit: usize = bounded(&lookup, "ADDRBOOK_SEARCH_LIMIT", "200", 1, 1_000)?;

        Ok(Self {
            bind_addr,
            database_path,
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            db_busy_timeout: Duration::from_secs(db_busy_timeout_secs),
            search_limit,
        })
    }
}

/// Parse an integer setting and check it lies in `[min, max]`.
fn bounded<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: &str,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display + Copy,
{
    let value = value_or_default(lookup, name, default)
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be an integer in [{min}, {max}]")))?;
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{min}, {max}]"
        )));
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
