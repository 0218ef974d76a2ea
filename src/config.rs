//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Default database location when `DATABASE_URL` is unset.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///./empresas.db";

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// A local SQLite/libSQL file.
    File(PathBuf),
    /// A process-local in-memory database.
    Memory,
}

impl DatabaseTarget {
    /// Parse a `DATABASE_URL`-style string.
    ///
    /// Accepts `sqlite:///path`, `sqlite://path`, `file:path`, a bare path,
    /// and `:memory:` (optionally behind one of the prefixes).
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        let rest = url
            .strip_prefix("sqlite:///")
            .or_else(|| url.strip_prefix("sqlite://"))
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);

        if rest.contains("://") {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_URL".into(),
                message: format!("unsupported database scheme in '{url}'"),
            });
        }
        if rest.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_URL".into(),
                message: "empty database path".into(),
            });
        }
        if rest == ":memory:" {
            return Ok(Self::Memory);
        }
        Ok(Self::File(PathBuf::from(rest)))
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Database location.
    pub database: DatabaseTarget,
}

impl ServerConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("EMPRESAS_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port: u16 = lookup("EMPRESAS_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let database = DatabaseTarget::parse(&database_url)?;

        Ok(Self {
            host,
            port,
            database,
        })
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
