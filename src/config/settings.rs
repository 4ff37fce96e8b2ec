//! Configuration sections
//!
//! Each section maps to one TOML table of the configuration file. Every field
//! has a default, so a partial file (or none at all) is valid.
//!
//! # Sections
//!
//! - [`DeviceSettings`] - serial port of the EMU-2
//! - [`SimulatorSettings`] - pacing and identity of the simulated device
//! - [`FramerSettings`] - stream framer limits
//! - [`OutputSettings`] - record format and console echo
//! - [`LoggingSettings`] - telemetry log file location and rotation

use crate::device::serial::DEFAULT_PORT;
use crate::device::simulator::{DEFAULT_DEVICE_MAC_ID, DEFAULT_INTERVAL, DEFAULT_METER_MAC_ID};
use crate::pipeline::nodes::LogRotation;
use crate::pipeline::DEFAULT_MAX_FRAGMENT_BYTES;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default telemetry log file name
pub const DEFAULT_LOG_FILE_NAME: &str = "emu.log";

/// Serial device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Device node of the EMU-2 (e.g. `/dev/ttyUSB0`)
    pub port: PathBuf,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            port: PathBuf::from(DEFAULT_PORT),
        }
    }
}

/// Simulated device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Minimum time between two simulated fragments
    pub interval_ms: u64,
    pub device_mac_id: String,
    pub meter_mac_id: String,
}

impl SimulatorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            device_mac_id: DEFAULT_DEVICE_MAC_ID.to_string(),
            meter_mac_id: DEFAULT_METER_MAC_ID.to_string(),
        }
    }
}

/// Stream framer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerSettings {
    /// Largest partial fragment kept before it is discarded (0 = unlimited)
    pub max_fragment_bytes: usize,
}

impl Default for FramerSettings {
    fn default() -> Self {
        Self {
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
        }
    }
}

/// Record output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,

    /// Echo every logged line to stdout
    pub echo: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            echo: true,
        }
    }
}

/// Telemetry log file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Directory holding the log files
    pub directory: PathBuf,

    /// Base file name; rotated files get a date suffix
    pub file_name: String,

    pub rotation: LogRotation,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            rotation: LogRotation::Daily,
        }
    }
}
