//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/addressbook` |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8000` |
//! | `PUBLIC_BASE_URL` | unset: links use the request `Host` |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `30` |
//! | `LOG_FORMAT` | `text` (`json` for structured output) |
//! | `LOG_FILE` | unset: stdout |
//! | `LOG_ANSI` | auto |

use std::net::SocketAddr;

use thiserror::Error;

use addressbook_core::defaults;

pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    NotANumber { name: &'static str, value: String },

    #[error("PUBLIC_BASE_URL must start with http:// or https://, got '{0}'")]
    BadBaseUrl(String),

    #[error("invalid listen address {0}")]
    BadAddress(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Absolute base for pagination links, without trailing slash.
    pub public_base_url: Option<String>,
    /// Comma-separated CORS origin whitelist.
    pub allowed_origins: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            public_base_url: None,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.to_string(),
            db_max_connections: defaults::DB_MAX_CONNECTIONS,
            db_acquire_timeout_secs: defaults::DB_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset or blank variables take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::NotANumber {
                name: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(base) = get("PUBLIC_BASE_URL") {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err(ConfigError::BadBaseUrl(base));
            }
            config.public_base_url = Some(base.trim_end_matches('/').to_string());
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = origins;
        }
        if let Some(max) = get("DB_MAX_CONNECTIONS") {
            config.db_max_connections = max.parse().map_err(|_| ConfigError::NotANumber {
                name: "DB_MAX_CONNECTIONS",
                value: max.clone(),
            })?;
        }
        if let Some(secs) = get("DB_ACQUIRE_TIMEOUT_SECS") {
            config.db_acquire_timeout_secs =
                secs.parse().map_err(|_| ConfigError::NotANumber {
                    name: "DB_ACQUIRE_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::BadAddress(addr))
    }
}

/// Output settings for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub json: bool,
    pub file: Option<String>,
    /// `None` leaves ANSI detection to the subscriber.
    pub ansi: Option<bool>,
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            json: lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
            file: lookup("LOG_FILE").filter(|f| !f.trim().is_empty()),
            ansi: lookup("LOG_ANSI").map(|v| v == "true" || v == "1"),
        }
    }
}
