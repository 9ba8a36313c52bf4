//! Configuration
//!
//! TigerStyle: Every option has a flag, an `MCP_*` variable and a default.
//!
//! Precedence is flag, then environment, then default. A `.env` file in the
//! working directory is loaded into the environment before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use registry_core::{
    SqliteConfig, SEED_FILE_PATH_DEFAULT, SQLITE_CONNECTIONS_IDLE_DEFAULT,
    SQLITE_CONNECTIONS_OPEN_MAX_DEFAULT, SQLITE_CONNECTION_LIFETIME_MINUTES_DEFAULT,
    SQLITE_OPERATION_TIMEOUT_MS_DEFAULT,
};
use serde::Serialize;

use crate::APP_NAME;

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default listen port
pub const HTTP_PORT_DEFAULT: u16 = 8080;

/// Default listen host
pub const HTTP_HOST_DEFAULT: &str = "localhost";

/// Default request timeout
pub const HTTP_REQUEST_TIMEOUT_SECS_DEFAULT: u64 = 10;

/// Default SQLite database file
pub const DATABASE_URL_DEFAULT: &str = "./data/registry.db";

// =============================================================================
// Enumerations
// =============================================================================

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    Dev,
    /// Local development (long form)
    Development,
    /// Automated tests
    Test,
    /// Pre-production
    Staging,
    /// Production
    Prod,
    /// Production (long form)
    Production,
}

impl Environment {
    /// Name as accepted on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Prod => "prod",
            Self::Production => "production",
        }
    }
}

/// Minimum log level when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything down to debug
    Debug,
    /// Informational and above
    Info,
    /// Warnings and errors
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Process memory, lost on exit
    Memory,
    /// SQLite database file
    Sqlite,
}

impl StorageType {
    /// Name as accepted on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

// =============================================================================
// Config
// =============================================================================

/// MCP server registry
#[derive(Parser, Debug, Clone)]
#[command(name = APP_NAME)]
#[command(about = "JSON HTTP registry of MCP server descriptions")]
#[command(version)]
pub struct Config {
    /// Listen port
    #[arg(long, env = "MCP_PORT", default_value_t = HTTP_PORT_DEFAULT)]
    pub port: u16,

    /// Listen host
    #[arg(long, env = "MCP_HOST", default_value = HTTP_HOST_DEFAULT)]
    pub host: String,

    /// Deployment environment
    #[arg(long = "env", env = "MCP_ENVIRONMENT", value_enum, default_value_t = Environment::Dev)]
    pub environment: Environment,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "MCP_LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Storage backend
    #[arg(long = "storage", env = "MCP_STORAGE_TYPE", value_enum, default_value_t = StorageType::Sqlite)]
    pub storage_type: StorageType,

    /// SQLite database file (`~` is expanded)
    #[arg(long = "db-url", env = "MCP_DATABASE_URL", default_value = DATABASE_URL_DEFAULT)]
    pub database_url: String,

    /// Maximum open database connections
    #[arg(long, env = "MCP_MAX_OPEN_CONNS", default_value_t = SQLITE_CONNECTIONS_OPEN_MAX_DEFAULT)]
    pub max_open_conns: u32,

    /// Idle database connections kept warm
    #[arg(long, env = "MCP_MAX_IDLE_CONNS", default_value_t = SQLITE_CONNECTIONS_IDLE_DEFAULT)]
    pub max_idle_conns: u32,

    /// Connection lifetime in minutes
    #[arg(long, env = "MCP_CONN_MAX_LIFETIME", default_value_t = SQLITE_CONNECTION_LIFETIME_MINUTES_DEFAULT)]
    pub conn_max_lifetime: u64,

    /// Per-operation database timeout in milliseconds
    #[arg(long, env = "MCP_DB_TIMEOUT_MS", default_value_t = SQLITE_OPERATION_TIMEOUT_MS_DEFAULT)]
    pub db_timeout_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "MCP_REQUEST_TIMEOUT", default_value_t = HTTP_REQUEST_TIMEOUT_SECS_DEFAULT)]
    pub request_timeout_secs: u64,

    /// Skip seeding an empty store at startup
    #[arg(long, env = "MCP_NO_SEED")]
    pub no_seed: bool,

    /// Seed dataset (`~` is expanded)
    #[arg(long, env = "MCP_SEED_FILE", default_value = SEED_FILE_PATH_DEFAULT)]
    pub seed_file: String,

    /// Enable verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Rejected configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting that must be positive was zero.
    #[error("{name} must be positive, got: {value}")]
    NotPositive {
        /// Option name
        name: &'static str,
        /// Offending value
        value: u64,
    },

    /// Host was empty.
    #[error("host cannot be empty")]
    EmptyHost,
}

impl Config {
    /// Load `.env`, then parse flags and environment.
    ///
    /// # Errors
    /// Returns error if the resulting configuration fails [`Config::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check values clap cannot express as types.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let positive = [
            ("max_open_conns", u64::from(self.max_open_conns)),
            ("max_idle_conns", u64::from(self.max_idle_conns)),
            ("conn_max_lifetime", self.conn_max_lifetime),
            ("db_timeout_ms", self.db_timeout_ms),
            ("request_timeout", self.request_timeout_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        Ok(())
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True for dev, development and test.
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(
            self.environment,
            Environment::Dev | Environment::Development | Environment::Test
        )
    }

    /// True for prod and production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Prod | Environment::Production)
    }

    /// Default `EnvFilter` directive; `-v` overrides the configured level.
    #[must_use]
    pub fn log_filter(&self) -> String {
        match self.verbose {
            0 => format!("{},tower_http=debug", self.log_level.as_str()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }

    /// Database file with `~` expanded.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database_url).into_owned())
    }

    /// Seed dataset with `~` expanded.
    #[must_use]
    pub fn seed_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.seed_file).into_owned())
    }

    /// HTTP request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Settings for [`registry_core::SqliteBackend::open`].
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteConfig {
        SqliteConfig::new(self.database_path())
            .with_pool(self.max_open_conns, self.max_idle_conns)
            .with_connection_max_lifetime(Duration::from_secs(
                self.conn_max_lifetime.saturating_mul(60),
            ))
            .with_operation_timeout(Duration::from_millis(self.db_timeout_ms))
    }

    /// Log the non-sensitive settings.
    pub fn log_config(&self) {
        tracing::info!(
            environment = self.environment.as_str(),
            address = %self.address(),
            log_level = self.log_level.as_str(),
            storage = self.storage_type.as_str(),
            seed = !self.no_seed,
            "configuration loaded"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
