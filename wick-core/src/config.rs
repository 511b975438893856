//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/wick/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/wick/` (~/.config/wick/)
//! - Data: `$XDG_DATA_HOME/wick/` (~/.local/share/wick/)
//! - State/Logs: `$XDG_STATE_HOME/wick/` (~/.local/state/wick/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Autosave key layout
    #[serde(default)]
    pub autosave: AutosaveConfig,

    /// Legacy converter options
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Key layout used by the autosave manager.
///
/// Older clients read the same store, so the defaults must not change.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Key holding the list of autosaved projects
    #[serde(default = "default_index_key")]
    pub index_key: String,

    /// Prefix for per-project snapshot keys
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// Prefix for cached asset source files
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            index_key: default_index_key(),
            data_prefix: default_data_prefix(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl AutosaveConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.index_key.is_empty() {
            return Err(Error::Config("autosave.index_key must not be empty".to_string()));
        }
        if self.data_prefix.is_empty() || self.file_prefix.is_empty() {
            return Err(Error::Config(
                "autosave.data_prefix and autosave.file_prefix must not be empty".to_string(),
            ));
        }
        if self.data_prefix == self.file_prefix {
            return Err(Error::Config(
                "autosave.data_prefix and autosave.file_prefix must differ".to_string(),
            ));
        }
        if self.index_key.starts_with(&self.data_prefix) {
            return Err(Error::Config(
                "autosave.index_key must not start with autosave.data_prefix".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_index_key() -> String {
    "autosaveList".to_string()
}

fn default_data_prefix() -> String {
    "autosave_".to_string()
}

fn default_file_prefix() -> String {
    "filesrc_".to_string()
}

/// How legacy scripts are mapped onto current script events
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPolicy {
    /// Whole legacy script becomes the `load` event
    #[default]
    LoadEvent,
    /// Top-level event functions become separate events
    SplitEvents,
}

/// Legacy converter configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConverterConfig {
    /// Script conversion policy
    #[serde(default)]
    pub script_policy: ScriptPolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.autosave.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/wick/config.toml` (~/.config/wick/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("wick").join("config.toml")
    }

    /// Returns the data directory path (for the autosave store)
    ///
    /// `$XDG_DATA_HOME/wick/` (~/.local/share/wick/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("wick")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/wick/` (~/.local/state/wick/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("wick")
    }

    /// Returns the autosave database path
    ///
    /// `$XDG_DATA_HOME/wick/autosave.db` (~/.local/share/wick/autosave.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("autosave.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.autosave.index_key, "autosaveList");
        assert_eq!(config.autosave.data_prefix, "autosave_");
        assert_eq!(config.autosave.file_prefix, "filesrc_");
        assert_eq!(config.converter.script_policy, ScriptPolicy::LoadEvent);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[autosave]
data_prefix = "snap:"

[converter]
script_policy = "split_events"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.autosave.data_prefix, "snap:");
        assert_eq!(config.autosave.index_key, "autosaveList");
        assert_eq!(config.converter.script_policy, ScriptPolicy::SplitEvents);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_autosave_config_validation() {
        assert!(AutosaveConfig::default().validate().is_ok());

        let config = AutosaveConfig {
            file_prefix: "autosave_".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AutosaveConfig {
            index_key: "autosave_list".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_invalid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[autosave]\nindex_key = \"\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
