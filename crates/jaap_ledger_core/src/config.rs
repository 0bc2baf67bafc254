//! Runtime configuration resolution.
//!
//! # Responsibility
//! - Resolve database, calendar and logging settings from the environment.
//! - Provide defaults that keep a fresh install usable without setup.
//!
//! # Invariants
//! - Blank environment values are ignored, never treated as paths.
//! - A validated config always has a non-empty database path.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "JAAP_LEDGER_DB_PATH";
pub const ENV_CALENDAR_PATH: &str = "JAAP_LEDGER_CALENDAR_PATH";
pub const ENV_LOG_DIR: &str = "JAAP_LEDGER_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "JAAP_LEDGER_LOG_LEVEL";

const DEFAULT_DB_FILE_NAME: &str = "jaap_ledger.sqlite3";
const DEFAULT_CALENDAR_FILE: &str = "poornima.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    EmptyCalendarPath,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "database path cannot be empty"),
            Self::EmptyCalendarPath => write!(f, "calendar path cannot be empty"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved settings for one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub db_path: PathBuf,
    pub calendar_path: PathBuf,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            calendar_path: PathBuf::from(DEFAULT_CALENDAR_FILE),
            log_dir: None,
            log_level: default_log_level().to_string(),
        }
    }
}

impl LedgerConfig {
    /// Reads `JAAP_LEDGER_*` variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_CALENDAR_PATH) {
            config.calendar_path = PathBuf::from(value);
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if self.calendar_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyCalendarPath);
        }
        Ok(())
    }
}
