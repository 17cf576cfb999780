//! Pinned-handle configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::backup::ApplyMode;

/// Configuration shared by every pinned handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    /// Interval between ticks of every pinned handle, in milliseconds
    #[serde(rename = "tick-interval-ms", default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Treat pins as always valid while no process is attached (skips retargeting)
    #[serde(rename = "assume-valid-when-detached", default = "default_assume_valid_when_detached")]
    pub assume_valid_when_detached: bool,

    /// Which part of a backup is written back after a cross-boundary retarget
    #[serde(rename = "restore-mode", default)]
    pub restore_mode: ApplyMode,

    /// Event bus capacity
    #[serde(rename = "event-capacity", default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_tick_interval_ms() -> u64 {
    debug!("default_tick_interval_ms: called");
    100
}

fn default_assume_valid_when_detached() -> bool {
    debug!("default_assume_valid_when_detached: called");
    cfg!(debug_assertions)
}

fn default_event_capacity() -> usize {
    debug!("default_event_capacity: called");
    1024
}

impl Default for PinConfig {
    fn default() -> Self {
        debug!("PinConfig::default: called");
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            assume_valid_when_detached: default_assume_valid_when_detached(),
            restore_mode: ApplyMode::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl PinConfig {
    /// Get the tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        debug!(tick_interval_ms = %self.tick_interval_ms, "PinConfig::tick_interval: called");
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PinConfig::default();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.assume_valid_when_detached, cfg!(debug_assertions));
        assert_eq!(config.restore_mode, ApplyMode::All);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_tick_interval_duration() {
        let config = PinConfig {
            tick_interval_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(250));

        let zero = PinConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero.tick_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PinConfig = serde_yaml::from_str("restore-mode: appearance\n").unwrap();
        assert_eq!(config.restore_mode, ApplyMode::Appearance);
        assert_eq!(config.tick_interval_ms, 100);
    }
}
