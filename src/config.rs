//! Configuration management for session-keeper.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;
use crate::persist::{PersistOptions, DEFAULT_STORAGE_KEY};

/// Directory used for the file backend when nothing else is configured.
pub const DEFAULT_STORAGE_DIR: &str = ".session-keeper";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable storage configuration.
    pub storage: StorageSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Durable storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding the snapshot files.
    pub dir: PathBuf,
    /// Key the session snapshot is stored under.
    pub key: String,
    /// Snapshot format version. File only: it pins the on-disk format, so
    /// there is no env or argument override.
    pub version: u32,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            key: DEFAULT_STORAGE_KEY.to_string(),
            version: 0,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; empty values count as unset.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = var("SESSION_KEEPER_STORAGE_DIR") {
            self.storage.dir = PathBuf::from(dir);
        }

        if let Some(key) = var("SESSION_KEEPER_STORAGE_KEY") {
            self.storage.key = key;
        }

        if let Some(level) = var("SESSION_KEEPER_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref dir) = args.dir {
            self.storage.dir = dir.clone();
        }

        if let Some(ref key) = args.key {
            self.storage.key = key.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the store cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.key.trim().is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        Ok(())
    }

    /// Persistence options for this configuration.
    pub fn persist_options(&self) -> PersistOptions {
        PersistOptions::new(self.storage.key.clone()).with_version(self.storage.version)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[source] serde_json::Error),
    /// Storage key is blank.
    #[error("storage key must not be empty")]
    EmptyKey,
}
