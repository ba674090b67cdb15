//! Persisted configuration model
//!
//! The whole daemon state lives in one JSON document: connection settings,
//! the three fan records, and the active power preset. The full object is
//! rewritten on every mutation; there is no merge-patching.

use crate::types::{FanId, FanState, PowerMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Returns the default path for the configuration file.
///
/// The daemon needs raw port I/O and therefore runs as root, so the
/// configuration lives under `/etc` rather than a per-user directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("/etc/ecfan/config.json")
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/log/ecfan/ecfand.log")
}

fn default_driver_path() -> PathBuf {
    PathBuf::from("/dev/port")
}

fn default_power_mode() -> PowerMode {
    PowerMode::Balanced
}

/// Complete daemon configuration, the unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP bind address
    pub host: String,
    /// HTTP bind port
    pub port: u16,
    /// Log file location (truncated at every start)
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// EC port device node
    #[serde(default = "default_driver_path")]
    pub driver_path: PathBuf,
    /// Active APU power preset
    #[serde(default = "default_power_mode")]
    pub power_mode: PowerMode,
    #[serde(default)]
    pub fan1: FanState,
    #[serde(default)]
    pub fan2: FanState,
    #[serde(default = "FanState::fan3_default")]
    pub fan3: FanState,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8395,
            log_path: default_log_path(),
            driver_path: default_driver_path(),
            power_mode: default_power_mode(),
            fan1: FanState::default(),
            fan2: FanState::default(),
            fan3: FanState::fan3_default(),
        }
    }
}

impl Config {
    /// Per-fan state by ID
    pub fn fan(&self, fan: FanId) -> &FanState {
        match fan.number() {
            1 => &self.fan1,
            2 => &self.fan2,
            _ => &self.fan3,
        }
    }

    /// Mutable per-fan state by ID
    pub fn fan_mut(&mut self, fan: FanId) -> &mut FanState {
        match fan.number() {
            1 => &mut self.fan1,
            2 => &mut self.fan2,
            _ => &mut self.fan3,
        }
    }

    /// Parse a configuration from its JSON representation.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
