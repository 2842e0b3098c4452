//! Configuration file support.
//!
//! Engine settings are a versioned JSON document. Every section and field has
//! a default, so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cmd::HistoryConfig;
use crate::constants::{DEFAULT_MAX_HISTORY, DEFAULT_MERGE_WINDOW, DEFAULT_SOURCE_ID};
use crate::error::ConfigError;

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Editor engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub undo: UndoSettings,

    #[serde(default)]
    pub loading: LoadingSettings,
}

/// General preferences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Undo history settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSettings {
    /// Maximum number of undo steps kept
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Window in which repeated edits of one object collapse into one step
    #[serde(default = "default_merge_window_ms")]
    pub merge_window_ms: u64,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_merge_window_ms() -> u64 {
    DEFAULT_MERGE_WINDOW.as_millis() as u64
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            merge_window_ms: default_merge_window_ms(),
        }
    }
}

impl UndoSettings {
    pub fn history_config(&self) -> HistoryConfig {
        HistoryConfig {
            max_history: self.max_history,
            merge_window: Duration::from_millis(self.merge_window_ms),
        }
    }
}

/// Loading behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingSettings {
    /// Fetch per-frame result sources when a frame is shown
    #[serde(default = "default_load_result_sources")]
    pub load_result_sources: bool,

    /// Source id of manually drawn annotations
    #[serde(default = "default_source_id")]
    pub default_source_id: String,
}

fn default_load_result_sources() -> bool {
    true
}

fn default_source_id() -> String {
    DEFAULT_SOURCE_ID.to_string()
}

impl Default for LoadingSettings {
    fn default() -> Self {
        Self {
            load_result_sources: default_load_result_sources(),
            default_source_id: default_source_id(),
        }
    }
}

impl EditorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: Preferences::default(),
            undo: UndoSettings::default(),
            loading: LoadingSettings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                supported: CONFIG_VERSION,
                found: config.version,
            });
        }

        Ok(config)
    }

    /// Get the default filename for config export.
    pub fn default_filename() -> &'static str {
        "scenelabel.json"
    }

    /// Load configuration from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"version":1,"undo":{"max_history":5}}"#).unwrap();
        assert_eq!(config.undo.max_history, 5);
        assert_eq!(config.undo.merge_window_ms, 500);
        assert!(config.loading.load_result_sources);
        assert_eq!(config.loading.default_source_id, "-1");
        assert_eq!(config.preferences.log_level, LogLevel::Info);
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = EditorConfig::from_json(r#"{"version":99}"#);
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = EditorConfig::new();
        config.preferences.log_level = LogLevel::Debug;
        config.loading.load_result_sources = false;
        let json = config.to_json().unwrap();
        assert!(json.contains("\"debug\""));
        assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let result = EditorConfig::load_from_file(Path::new("/nonexistent/scenelabel.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_history_config() {
        let undo = UndoSettings {
            max_history: 7,
            merge_window_ms: 250,
        };
        let history = undo.history_config();
        assert_eq!(history.max_history, 7);
        assert_eq!(history.merge_window, Duration::from_millis(250));
    }
}
