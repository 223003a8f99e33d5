//! Store configuration.
//!
//! # Responsibility
//! - Describe where the todo database lives and how the pool behaves.
//! - Read overrides from process environment variables.
//!
//! # Invariants
//! - `pool_size` is at least 1.
//! - `operation_timeout` is non-zero; it bounds pool checkout, lock waits and
//!   statement execution for every store call.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "TODO_DB_PATH";
pub const ENV_DB_POOL_SIZE: &str = "TODO_DB_POOL_SIZE";
pub const ENV_DB_TIMEOUT_MS: &str = "TODO_DB_TIMEOUT_MS";

const DEFAULT_POOL_SIZE: u32 = 8;
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file path. `None` keeps the database in memory.
    pub database_path: Option<PathBuf>,
    /// Maximum pooled connections for file databases.
    pub pool_size: u32,
    /// Upper bound for a single store operation.
    pub operation_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            pool_size: DEFAULT_POOL_SIZE,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl StoreConfig {
    /// File-backed configuration with default pool and timeout settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Builds a config from `TODO_DB_PATH`, `TODO_DB_POOL_SIZE` and
    /// `TODO_DB_TIMEOUT_MS`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = non_empty(lookup(ENV_DB_POOL_SIZE)) {
            config.pool_size = match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::invalid(ENV_DB_POOL_SIZE, raw)),
            };
        }

        if let Some(raw) = non_empty(lookup(ENV_DB_TIMEOUT_MS)) {
            config.operation_timeout = match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::invalid(ENV_DB_TIMEOUT_MS, raw)),
            };
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Malformed configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub variable: &'static str,
    pub value: String,
}

impl ConfigError {
    fn invalid(variable: &'static str, value: String) -> Self {
        Self { variable, value }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid value `{}` for {}; expected a positive integer",
            self.value, self.variable
        )
    }
}

impl Error for ConfigError {}
