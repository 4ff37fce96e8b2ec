//! Configuration module for emu-telemetry
//!
//! The configuration is a single TOML file. It is looked up in this order:
//!
//! 1. an explicit path (`--config <path>`)
//! 2. the `EMU_TELEMETRY_CONFIG` environment variable
//! 3. the platform config directory:
//!    - **Linux**: `~/.config/emu-telemetry/config.toml`
//!    - **macOS**: `~/Library/Application Support/emu-telemetry/config.toml`
//!    - **Windows**: `%APPDATA%\emu-telemetry\config.toml`
//!
//! A missing file means defaults.
//!
//! # Example
//!
//! ```toml
//! [device]
//! port = "/dev/ttyUSB0"
//!
//! [output]
//! format = "csv"
//! echo = true
//!
//! [logging]
//! directory = "/var/log/emu"
//! file_name = "emu.log"
//! rotation = "daily"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{EmuError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "emu-telemetry";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "EMU_TELEMETRY_CONFIG";

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Resolve the config file to use: explicit path, then environment, then default.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => default_config_path(),
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceSettings,
    pub simulator: SimulatorSettings,
    pub framer: FramerSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the resolved location (see module docs).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match resolve_config_path(explicit) {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.device.port.as_os_str().is_empty() {
            return Err(EmuError::Config("device.port must not be empty".to_string()));
        }
        if self.simulator.interval_ms == 0 {
            return Err(EmuError::Config(
                "simulator.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.logging.file_name.trim().is_empty() {
            return Err(EmuError::Config(
                "logging.file_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| EmuError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Write the configuration as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.device.port, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(config.framer.max_fragment_bytes, 65536);
        assert_eq!(config.simulator.interval(), Duration::from_secs(4));
        assert_eq!(config.logging.rotation, crate::pipeline::nodes::LogRotation::Daily);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [output]
            format = "json"

            [simulator]
            interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.echo);
        assert_eq!(config.simulator.interval_ms, 500);
        assert_eq!(config.simulator.device_mac_id, "0xd8d5b9000000014b");
    }

    #[test]
    fn test_validation_errors() {
        let err = AppConfig::from_toml("[simulator]\ninterval_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("interval_ms"));

        let err = AppConfig::from_toml("[logging]\nfile_name = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("file_name"));

        let err = AppConfig::from_toml("[device]\nport = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("device.port"));
    }

    #[test]
    fn test_parse_error() {
        let err = AppConfig::from_toml("[output\nformat = 1").unwrap_err();
        assert!(matches!(err, EmuError::ConfigParse(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = AppConfig::default();
        config.output.echo = false;
        config.logging.file_name = "house.log".to_string();

        config.save(&path).unwrap();
        let loaded = AppConfig::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, AppConfig::default());
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = Path::new("/tmp/explicit.toml");
        assert_eq!(
            resolve_config_path(Some(explicit)),
            Some(explicit.to_path_buf())
        );
    }
}
