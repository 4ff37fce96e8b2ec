//! Error handling for emu-telemetry
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the pipeline, the devices and the stages.

use thiserror::Error;

/// Main error type for emu-telemetry operations
#[derive(Error, Debug)]
pub enum EmuError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by an external device (serial port, file, simulator)
    #[error("Device error ({device}): {message}")]
    Device { device: String, message: String },

    /// Errors raised by a pipeline stage while receiving a message
    #[error("Stage error ({stage}): {message}")]
    Stage { stage: String, message: String },

    /// Errors related to fragment decoding
    #[error("Decode error: {0}")]
    Decode(String),

    /// Errors related to configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors parsing a configuration file
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EmuError>,
    },
}

impl EmuError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EmuError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a device error
    pub fn device(device: impl Into<String>, message: impl Into<String>) -> Self {
        EmuError::Device {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create a stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        EmuError::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for emu-telemetry operations
pub type Result<T> = std::result::Result<T, EmuError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EmuError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| EmuError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmuError::Decode("missing root element".to_string());
        assert_eq!(err.to_string(), "Decode error: missing root element");
    }

    #[test]
    fn test_error_with_context() {
        let err = EmuError::device("/dev/ttyUSB0", "port vanished");
        let with_ctx = err.with_context("Failed to read line");
        assert!(with_ctx.to_string().contains("Failed to read line"));
        assert!(with_ctx.to_string().contains("port vanished"));
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = res.context("Opening replay file").unwrap_err();
        assert!(err.to_string().starts_with("Opening replay file"));
    }

    #[test]
    fn test_stage_error() {
        let err = EmuError::stage("FileLogger", "disk full");
        assert!(err.to_string().contains("FileLogger"));
        assert!(err.to_string().contains("disk full"));
    }
}
