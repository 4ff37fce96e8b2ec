//! FileLogger node - appends every message to a log file and forwards it.
//!
//! The file rolls over daily, hourly or never, through `tracing-appender`.
//! With rotation enabled the active file is `<file_name>.<date>` in the log
//! directory; without it the file is `<file_name>` itself.

use crate::error::{EmuError, Result, ResultExt};
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Log file rotation period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

pub struct FileLogger {
    label: String,
    writer: Box<dyn Write + Send>,
    written: u64,
    output: Broadcaster<String>,
}

impl FileLogger {
    /// Log into `directory`, creating it if needed.
    pub fn rolling(directory: &Path, file_name: &str, rotation: LogRotation) -> Result<Self> {
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(rotation.into())
            .filename_prefix(file_name)
            .build(directory)
            .map_err(|e| EmuError::stage("FileLogger", e.to_string()))?;
        tracing::info!(
            "Logging to {} ({:?} rotation)",
            directory.join(file_name).display(),
            rotation
        );
        Ok(Self::with_writer(
            directory.join(file_name).display().to_string(),
            appender,
        ))
    }

    /// Log into any writer (tests, pipes).
    pub fn with_writer(label: impl Into<String>, writer: impl Write + Send + 'static) -> Self {
        Self {
            label: label.into(),
            writer: Box::new(writer),
            written: 0,
            output: Broadcaster::new(),
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Listener<String> for FileLogger {
    fn receive(&mut self, line: &String) -> Result<()> {
        writeln!(self.writer, "{}", line)
            .and_then(|_| self.writer.flush())
            .with_context(|| format!("Failed to append to {}", self.label))?;
        self.written += 1;
        self.output.broadcast(line)
    }

    fn name(&self) -> &str {
        "FileLogger"
    }
}

impl Producer<String> for FileLogger {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}
