//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use tourney::{db::DatabaseConfig, recommend::DEFAULT_HISTORY_WINDOW};

/// Largest history window a recommendation may consult
const MAX_HISTORY_WINDOW: usize = 1000;

/// Where brackets and recommendations are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL through the configured pool
    Postgres,
    /// Process-local stores, lost on restart
    Memory,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Prometheus scrape address, metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Storage backend selection
    pub storage: StorageBackend,
    /// Number of past recommendations consulted per sport
    pub history_window: usize,
}

/// Values given on the command line, which win over the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a set variable cannot be parsed
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let metrics_bind = parse_addr("METRICS_BIND")?;

        let mut database = DatabaseConfig::from_env();
        if let Some(url) = overrides.database_url {
            database.database_url = url;
        }

        let storage = if overrides.memory || parse_env_or("MEMORY_STORE", false) {
            StorageBackend::Memory
        } else {
            StorageBackend::Postgres
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            database,
            storage,
            history_window: parse_env_or("HISTORY_WINDOW", DEFAULT_HISTORY_WINDOW),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_window == 0 || self.history_window > MAX_HISTORY_WINDOW {
            return Err(ConfigError::Invalid {
                var: "HISTORY_WINDOW".to_string(),
                reason: format!("Must be between 1 and {}", MAX_HISTORY_WINDOW),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must differ from the server bind address".to_string(),
            });
        }

        if self.storage == StorageBackend::Memory {
            return Ok(());
        }

        if self.database.database_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Pass --db-url or run with --memory".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "QUERY_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

/// Parse an optional socket address, rejecting values that are set but malformed
fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("'{}' is not an IP:PORT address", value),
            }),
        Err(_) => Ok(None),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
