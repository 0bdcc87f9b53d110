//! Configuration for Sundial Heartbeat.

use crate::core::{Pulsetime, PulsetimeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default merge tolerance in seconds.
pub const DEFAULT_PULSETIME_SECS: f64 = 60.0;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Merge tolerance for heartbeats (in seconds)
    pub pulsetime_secs: f64,

    /// Path for writing reduced event files
    pub export_path: PathBuf,

    /// Path for storing the reduction log
    pub data_path: PathBuf,

    /// IANA zone used when showing events; system zone when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_timezone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sundial-heartbeat");

        Self {
            pulsetime_secs: DEFAULT_PULSETIME_SECS,
            export_path: data_dir.join("exports"),
            data_path: data_dir,
            display_timezone: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.pulsetime()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sundial-heartbeat")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// The configured merge tolerance.
    pub fn pulsetime(&self) -> Result<Pulsetime, ConfigError> {
        Pulsetime::from_secs_f64(self.pulsetime_secs).map_err(ConfigError::InvalidPulsetime)
    }

    /// Validate and store a new merge tolerance, leaving other settings alone.
    pub fn set_pulsetime(&mut self, secs: f64) -> Result<Pulsetime, ConfigError> {
        let pulsetime = Pulsetime::from_secs_f64(secs).map_err(ConfigError::InvalidPulsetime)?;
        self.pulsetime_secs = pulsetime.as_secs_f64();
        Ok(pulsetime)
    }

    /// Path of the persisted reduction log.
    pub fn reduction_log_path(&self) -> PathBuf {
        self.data_path.join("reductions.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidPulsetime(PulsetimeError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidPulsetime(e) => write!(f, "Invalid pulsetime: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("sundial-heartbeat-config-test")
            .join(format!("{name}-{}.json", std::process::id()))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pulsetime_secs, DEFAULT_PULSETIME_SECS);
        assert!(config.display_timezone.is_none());
        assert_eq!(
            config.pulsetime().unwrap().as_duration(),
            Duration::seconds(60)
        );
        assert!(config.export_path.starts_with(&config.data_path));
    }

    #[test]
    fn test_invalid_pulsetime() {
        let config = Config {
            pulsetime_secs: -1.0,
            ..Config::default()
        };
        assert!(matches!(
            config.pulsetime(),
            Err(ConfigError::InvalidPulsetime(PulsetimeError::Negative))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            pulsetime_secs: 12.5,
            display_timezone: Some("Europe/Berlin".to_string()),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded.pulsetime_secs, 12.5);
        assert_eq!(loaded.display_timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = temp_config_path("missing");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pulsetime_secs, DEFAULT_PULSETIME_SECS);
    }

    #[test]
    fn test_load_rejects_negative_pulsetime() {
        let path = temp_config_path("negative");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"pulsetime_secs":-5,"export_path":"e","data_path":"d"}"#,
        )
        .unwrap();

        let result = Config::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::InvalidPulsetime(_))));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let result = Config::load_from(&path);
        let untouched = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
        assert_eq!(untouched, "{ not json");
    }

    #[test]
    fn test_set_pulsetime_keeps_other_settings() {
        let path = temp_config_path("set-pulsetime");
        let config = Config {
            pulsetime_secs: 30.0,
            export_path: PathBuf::from("/srv/sundial/exports"),
            data_path: PathBuf::from("/srv/sundial"),
            display_timezone: Some("Asia/Tokyo".to_string()),
        };
        config.save_to(&path).unwrap();

        let mut loaded = Config::load_from(&path).unwrap();
        let pulsetime = loaded.set_pulsetime(10.0).unwrap();
        loaded.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(pulsetime.as_duration(), Duration::seconds(10));
        assert_eq!(reloaded.pulsetime_secs, 10.0);
        assert_eq!(reloaded.display_timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(reloaded.export_path, PathBuf::from("/srv/sundial/exports"));
        assert_eq!(reloaded.data_path, PathBuf::from("/srv/sundial"));
    }

    #[test]
    fn test_set_pulsetime_rejects_negative() {
        let mut config = Config {
            pulsetime_secs: 30.0,
            ..Config::default()
        };
        assert!(matches!(
            config.set_pulsetime(-5.0),
            Err(ConfigError::InvalidPulsetime(PulsetimeError::Negative))
        ));
        assert_eq!(config.pulsetime_secs, 30.0);
    }
}
