//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::storage::{OverwritePolicy, StoreConfig, SyncMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for store handles opened by the CLI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub sync_mode: SyncMode,

    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

impl StorageConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .sync_mode(self.sync_mode)
            .overwrite(self.overwrite)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

fn parse_sync_mode(value: &str) -> Option<SyncMode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "every_write" | "every-write" => Some(SyncMode::EveryWrite),
        "on_close" | "on-close" => Some(SyncMode::OnClose),
        _ => None,
    }
}

fn parse_overwrite(value: &str) -> Option<OverwritePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "reject" => Some(OverwritePolicy::Reject),
        "replace" => Some(OverwritePolicy::Replace),
        _ => None,
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Config file locations, in search order
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tilestore").join("config.toml"));
        }
        paths.push(PathBuf::from("./tilestore.toml"));
        paths
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Storage overrides
        if let Ok(value) = std::env::var("TILESTORE_SYNC_MODE") {
            match parse_sync_mode(&value) {
                Some(mode) => self.storage.sync_mode = mode,
                None => tracing::warn!("Ignoring TILESTORE_SYNC_MODE={}", value),
            }
        }
        if let Ok(value) = std::env::var("TILESTORE_OVERWRITE") {
            match parse_overwrite(&value) {
                Some(policy) => self.storage.overwrite = policy,
                None => tracing::warn!("Ignoring TILESTORE_OVERWRITE={}", value),
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("TILESTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TILESTORE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Tilestore Configuration
#
# Environment variables override these settings:
# - TILESTORE_SYNC_MODE
# - TILESTORE_OVERWRITE
# - TILESTORE_LOG_LEVEL
# - TILESTORE_LOG_FORMAT

[storage]
# When writes reach disk: every_write or on_close
sync_mode = "every_write"

# Second write to a coordinate: reject or replace
overwrite = "reject"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/tilestore/tilestore.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.storage.sync_mode, SyncMode::EveryWrite);
        assert_eq!(config.storage.overwrite, OverwritePolicy::Reject);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nsync_mode = \"on_close\"\noverwrite = \"replace\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        let store = config.storage.store_config();
        assert_eq!(store.sync_mode, SyncMode::OnClose);
        assert_eq!(store.overwrite, OverwritePolicy::Replace);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[storage]\nsync_mode = \"sometimes\"\n").unwrap();
        assert!(matches!(Config::load(&bad), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_value_parsing() {
        assert_eq!(parse_sync_mode("ON_CLOSE"), Some(SyncMode::OnClose));
        assert_eq!(parse_sync_mode("every-write"), Some(SyncMode::EveryWrite));
        assert_eq!(parse_sync_mode("never"), None);
        assert_eq!(parse_overwrite(" Replace "), Some(OverwritePolicy::Replace));
        assert_eq!(parse_overwrite("merge"), None);
    }
}
