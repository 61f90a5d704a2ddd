//! # pasp-config
//!
//! Configuration management for the pasp preprocessor.
//!
//! Loads configuration from:
//! 1. `~/.pasp/config.toml` (global)
//! 2. `.pasp/config.toml` (project-local, overrides global key by key)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;
use tracing::debug;

/// Default number of live slots in the request table.
pub const DEFAULT_TABLE_CAPACITY: usize = 64;

/// Default bound on waiting for a free slot, in milliseconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5000;

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> =
    Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap_or_else(PoisonError::into_inner)
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub build: BuildConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let mut config = Self::load_from(global.as_deref(), Path::new(Self::PROJECT_CONFIG))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Project-relative config location.
    pub const PROJECT_CONFIG: &'static str = ".pasp/config.toml";

    /// Global config path: ~/.pasp/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pasp/config.toml"))
    }

    /// Load and layer the global and project files. Missing files are skipped.
    pub fn load_from(global: Option<&Path>, project: &Path) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();

        if let Some(global_path) = global {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                let contents = std::fs::read_to_string(global_path)?;
                merge_tables(&mut merged, toml::from_str(&contents)?);
            }
        }

        if project.exists() {
            debug!("Loading project config from {:?}", project);
            let contents = std::fs::read_to_string(project)?;
            merge_tables(&mut merged, toml::from_str(&contents)?);
        }

        let config: Config = toml::Value::Table(merged).try_into()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = lookup("PASP_TABLE_CAPACITY").and_then(|v| v.parse().ok()) {
            self.table.capacity = n;
        }
        if let Some(ms) = lookup("PASP_ACQUIRE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.table.acquire_timeout_ms = ms;
        }
        if let Some(root) = lookup("PASP_DOCUMENT_ROOT") {
            self.build.document_root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.table.capacity == 0 {
            return Err(ConfigError::Invalid(
                "table.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        Config::default().to_toml()
    }

    pub fn to_toml(&self) -> String {
        // Every field is a plain scalar or string, serialization cannot fail.
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Recursively overlay `overlay` onto `base`; scalar keys in `overlay` win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Request table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Maximum number of distinct source files tracked at once
    pub capacity: usize,
    /// How long a caller waits for a free slot before failing
    pub acquire_timeout_ms: u64,
}

impl TableConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TABLE_CAPACITY,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
        }
    }
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root that logical source paths are resolved under (empty = none)
    pub document_root: PathBuf,
    /// fsync translated output before it replaces the target
    pub sync_output: bool,
}

impl BuildConfig {
    pub fn document_root(&self) -> Option<&Path> {
        if self.document_root.as_os_str().is_empty() {
            None
        } else {
            Some(&self.document_root)
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::new(),
            sync_output: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when neither PASP_LOG nor RUST_LOG is set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
