//! Pinkeep configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pin::PinConfig;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Pinned-handle behavior
    pub pins: PinConfig,

    /// Event history recording
    pub events: EventsConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .pinkeep.yml
        let local_config = PathBuf::from(".pinkeep.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/pinkeep/pinkeep.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Any failure yields `None`; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".pinkeep.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .into_iter()
            .find(|path| path.exists())
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pinkeep").join("pinkeep.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Event history recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Append every pin event to a JSONL history file
    pub record: bool,

    /// History directory (defaults to `<data_local_dir>/pinkeep/pins`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::ApplyMode;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.log_level.is_none());
        assert_eq!(config.pins.tick_interval_ms, 100);
        assert!(!config.events.record);
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("pinkeep.yml");
        fs::write(
            &path,
            "log-level: debug\npins:\n  tick-interval-ms: 50\n  restore-mode: equipment\nevents:\n  record: true\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.pins.tick_interval_ms, 50);
        assert_eq!(config.pins.restore_mode, ApplyMode::Equipment);
        assert!(config.events.record);
        assert_eq!(config.pins.event_capacity, 1024);

        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("bad.yml");
        fs::write(&path, "pins: [not, a, map]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_config_serializes_to_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("tick-interval-ms"));
        assert!(yaml.contains("restore-mode"));
        assert!(!yaml.contains("log-level"));
    }
}
