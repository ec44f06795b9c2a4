//! `decklineage` configuration file.
//!
//! ```toml
//! store_path = ".decklineage/permutations.jsonl"
//! decks_path = ".decklineage/decks.json"
//! lock_retry_delay_ms = 20     # lock_retry_attempts unset: wait for the lock
//! log_level = "warn"
//! ```
//!
//! Every key is optional. Command-line flags override file values.

use decklineage_store::{DEFAULT_LOCK_RETRY_DELAY_MS, LockPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_CONFIG_PATH: &str = ".decklineage/config.toml";
pub const DEFAULT_STORE_PATH: &str = ".decklineage/permutations.jsonl";
pub const DEFAULT_DECKS_PATH: &str = ".decklineage/decks.json";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineageConfig {
    /// Permutation store (JSONL).
    pub store_path: PathBuf,

    /// Live deck contents (JSON map of deck id to items).
    pub decks_path: PathBuf,

    /// Extra attempts when the store lock is busy. Unset waits until the
    /// lock is free; zero fails fast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_retry_attempts: Option<u32>,

    /// Pause between lock attempts.
    pub lock_retry_delay_ms: u64,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            decks_path: PathBuf::from(DEFAULT_DECKS_PATH),
            lock_retry_attempts: None,
            lock_retry_delay_ms: DEFAULT_LOCK_RETRY_DELAY_MS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LineageConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, else the default location if it exists,
    /// else built-in defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path cannot be empty".to_string()));
        }
        if self.decks_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("decks_path cannot be empty".to_string()));
        }
        if self.lock_retry_attempts != Some(0) && self.lock_retry_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "lock_retry_delay_ms must be > 0 unless lock_retry_attempts = 0".to_string(),
            ));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "log_level `{}` is not one of off, error, warn, info, debug, trace",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn lock_policy(&self) -> LockPolicy {
        let retry_delay = Duration::from_millis(self.lock_retry_delay_ms);
        match self.lock_retry_attempts {
            Some(attempts) => LockPolicy::bounded(attempts, retry_delay),
            None => LockPolicy {
                retry_attempts: None,
                retry_delay,
            },
        }
    }
}
