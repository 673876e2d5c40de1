use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::pagination::{DefaultLimit, PaginationError};
use crate::services::UpdateDatePolicy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub default_limit: DefaultLimit,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub date_policy: UpdateDatePolicy,
}

impl Config {
    pub fn new_from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, so callers other than
    /// the binary never need to touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://courses.db".to_string());

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_positive("DATABASE_MAX_CONNECTIONS", &raw)?,
            None => 5,
        };

        let bind_addr = match lookup("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
                reason: "expected host:port",
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 3000)),
        };

        let default_limit = lookup("PAGINATOR_LIMIT_DEFAULT")
            .unwrap_or_else(|| "10".to_string())
            .parse::<DefaultLimit>()?;

        let api_token = lookup("API_TOKEN").filter(|token| !token.is_empty());

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(u64::from(parse_positive("REQUEST_TIMEOUT_SECS", &raw)?)),
            None => Duration::from_secs(10),
        };

        let date_policy = match lookup("ADVANCE_UPDATED_DATES").as_deref() {
            None | Some("true") | Some("1") => UpdateDatePolicy::AdvanceOneDay,
            Some("false") | Some("0") => UpdateDatePolicy::AsGiven,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "ADVANCE_UPDATED_DATES",
                    value: other.to_string(),
                    reason: "expected true or false",
                });
            }
        };

        Ok(Self {
            database_url,
            max_connections,
            bind_addr,
            default_limit,
            api_token,
            request_timeout,
            date_policy,
        })
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a positive integer",
        })
}
