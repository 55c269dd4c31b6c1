use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::event::codec::LogFormat;

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE: &str = "things.toml";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "THINGS_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Log file name, relative to the data directory.
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// `sync_data` after each save.
    #[serde(default = "default_true")]
    pub durable: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
            durable: default_true(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Save after every successful command.
    #[serde(default = "default_true")]
    pub autosave: bool,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave: default_true(),
            format: LogFormat::default(),
        }
    }
}

/// Load `things.toml` from `dir`. A missing file yields the defaults.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_config(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Directory holding the event log and `things.toml`.
///
/// `THINGS_DIR` wins; otherwise the platform data directory. Returns `None`
/// when neither is available.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    resolve_data_dir(env::var_os(DATA_DIR_ENV).map(PathBuf::from), dirs::data_dir())
}

fn resolve_data_dir(env_dir: Option<PathBuf>, platform_dir: Option<PathBuf>) -> Option<PathBuf> {
    env_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .or_else(|| platform_dir.map(|dir| dir.join("clean-things")))
}

const fn default_true() -> bool {
    true
}

fn default_log_file() -> String {
    "events.log".to_string()
}

const fn default_lock_timeout_ms() -> u64 {
    2000
}
