//! External reader resources for pipeline sources.
//!
//! A [`Connector`] performs setup: every `Source::start` asks it for a fresh
//! [`LineDevice`]. The device is then owned by the source's reader thread,
//! which calls [`LineDevice::read`] once per loop iteration and
//! [`LineDevice::close`] exactly once when the loop exits.
//!
//! # Devices
//!
//! - [`SerialConnector`] - EMU-2 USB serial port (read half + write half)
//! - [`FileConnector`] / [`StdinConnector`] - line replay from a file or the console
//! - [`SimulatorConnector`] - synthetic EMU-2 emitting demand fragments on an interval
//! - [`FnConnector`] - closure-backed connector for custom or in-memory devices

pub mod serial;
pub mod simulator;
pub mod stream;

pub use serial::{SerialConnector, SerialDevice};
pub use simulator::{SimulatorConnector, SimulatorDevice};
pub use stream::{FileConnector, StdinConnector, StreamDevice};

use crate::error::Result;

/// Result of one read from a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line (or whole fragment) without its trailing line terminator
    Line(String),
    /// The read produced nothing this time; the loop simply continues
    Nothing,
    /// The resource is exhausted; the source stops normally
    EndOfInput,
}

/// Write half of a device: receives inbound messages (e.g. commands).
pub trait DeviceWriter: Send {
    fn write(&mut self, text: &str) -> Result<()>;
}

/// Read half of an opened external resource.
#[cfg_attr(test, mockall::automock)]
pub trait LineDevice: Send {
    /// Block until the next line is available, the input ends, or reading fails.
    fn read(&mut self) -> Result<ReadOutcome>;

    /// Hand out a write half for inbound messages, if the device accepts any.
    fn writer(&mut self) -> Result<Option<Box<dyn DeviceWriter>>> {
        Ok(None)
    }

    /// Release the resource. Called once, from the reader thread.
    fn close(&mut self) {}

    /// Short description for logs (port path, file name, ...).
    fn describe(&self) -> String;
}

/// Setup half of a source: opens a new device instance on every start.
pub trait Connector: Send + Sync + 'static {
    type Device: LineDevice + 'static;

    fn open(&self) -> Result<Self::Device>;

    /// Name used for the source's thread and log span.
    fn name(&self) -> String;
}

/// Connector backed by a closure.
pub struct FnConnector<F> {
    name: String,
    open: F,
}

impl<F, D> FnConnector<F>
where
    F: Fn() -> Result<D> + Send + Sync + 'static,
    D: LineDevice + 'static,
{
    pub fn new(name: impl Into<String>, open: F) -> Self {
        Self {
            name: name.into(),
            open,
        }
    }
}

impl<F, D> Connector for FnConnector<F>
where
    F: Fn() -> Result<D> + Send + Sync + 'static,
    D: LineDevice + 'static,
{
    type Device = D;

    fn open(&self) -> Result<D> {
        (self.open)()
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

impl LineDevice for Box<dyn LineDevice> {
    fn read(&mut self) -> Result<ReadOutcome> {
        (**self).read()
    }

    fn writer(&mut self) -> Result<Option<Box<dyn DeviceWriter>>> {
        (**self).writer()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Writer for devices that accept inbound messages but cannot act on them.
pub struct LoggingWriter {
    device: String,
}

impl LoggingWriter {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl DeviceWriter for LoggingWriter {
    fn write(&mut self, text: &str) -> Result<()> {
        tracing::info!("Write to {}: {}", self.device, text);
        Ok(())
    }
}
