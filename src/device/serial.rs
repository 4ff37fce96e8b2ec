//! EMU-2 USB serial device.
//!
//! The port is opened as a plain character device. Line settings (115200 8N1)
//! are left to the operating system, e.g. `stty -F /dev/ttyUSB0 115200 raw`.

use super::stream::read_trimmed_line;
use super::{Connector, DeviceWriter, LineDevice, ReadOutcome};
use crate::error::{EmuError, Result, ResultExt};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Default device node of the EMU-2 on Linux
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Opens the serial port on every start.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: PathBuf,
}

impl SerialConnector {
    pub fn new(port: impl Into<PathBuf>) -> Self {
        Self { port: port.into() }
    }

    pub fn port(&self) -> &Path {
        &self.port
    }
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl Connector for SerialConnector {
    type Device = SerialDevice;

    fn open(&self) -> Result<SerialDevice> {
        SerialDevice::open(&self.port)
    }

    fn name(&self) -> String {
        format!("serial:{}", self.port.display())
    }
}

/// An open serial port: buffered read half plus a cloneable write half.
pub struct SerialDevice {
    port: PathBuf,
    reader: Option<BufReader<File>>,
}

impl SerialDevice {
    pub fn open(port: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(port)
            .with_context(|| format!("Failed to open serial port {}", port.display()))?;
        tracing::info!("Opened serial port {}", port.display());
        Ok(Self {
            port: port.to_path_buf(),
            reader: Some(BufReader::new(file)),
        })
    }

    fn label(&self) -> String {
        self.port.display().to_string()
    }
}

impl LineDevice for SerialDevice {
    fn read(&mut self) -> Result<ReadOutcome> {
        let label = self.label();
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| EmuError::device(&label, "port closed"))?;
        read_trimmed_line(reader).with_context(|| format!("Failed to read from {}", label))
    }

    fn writer(&mut self) -> Result<Option<Box<dyn DeviceWriter>>> {
        let label = self.label();
        let reader = self
            .reader
            .as_ref()
            .ok_or_else(|| EmuError::device(&label, "port closed"))?;
        let file = reader
            .get_ref()
            .try_clone()
            .with_context(|| format!("Failed to clone handle for {}", label))?;
        Ok(Some(Box::new(SerialWriter { label, file })))
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::info!("Closed serial port {}", self.port.display());
        }
    }

    fn describe(&self) -> String {
        self.label()
    }
}

/// Write half: inbound text is written to the port verbatim.
struct SerialWriter {
    label: String,
    file: File,
}

impl DeviceWriter for SerialWriter {
    fn write(&mut self, text: &str) -> Result<()> {
        tracing::debug!("Write to {}: {}", self.label, text);
        self.file
            .write_all(text.as_bytes())
            .and_then(|_| self.file.flush())
            .with_context(|| format!("Failed to write to {}", self.label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    // A regular file stands in for the character device.
    fn fake_port(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_port() {
        assert_eq!(SerialConnector::default().port(), Path::new(DEFAULT_PORT));
    }

    #[test]
    fn test_missing_port_fails_setup() {
        let connector = SerialConnector::new("/dev/does-not-exist-emu");
        let err = connector.open().err().unwrap();
        assert!(err.to_string().contains("does-not-exist-emu"));
    }

    #[test]
    fn test_reads_lines_without_terminators() {
        let port = fake_port("<InstantaneousDemand>\r\n</InstantaneousDemand>\r\n");
        let mut device = SerialConnector::new(port.path()).open().unwrap();

        assert_eq!(
            device.read().unwrap(),
            ReadOutcome::Line("<InstantaneousDemand>".into())
        );
        assert_eq!(
            device.read().unwrap(),
            ReadOutcome::Line("</InstantaneousDemand>".into())
        );
        assert_eq!(device.read().unwrap(), ReadOutcome::EndOfInput);
    }

    #[test]
    fn test_writer_writes_verbatim() {
        let port = fake_port("");
        let mut device = SerialDevice::open(port.path()).unwrap();
        let mut writer = device.writer().unwrap().unwrap();

        writer.write("<Command><Name>restart</Name></Command>").unwrap();

        let mut file = port.reopen().unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut written = String::new();
        file.read_to_string(&mut written).unwrap();
        assert_eq!(written, "<Command><Name>restart</Name></Command>");
    }

    #[test]
    fn test_closed_device_rejects_reads_and_writers() {
        let port = fake_port("line\n");
        let mut device = SerialDevice::open(port.path()).unwrap();
        device.close();
        device.close();

        assert!(device.read().is_err());
        assert!(device.writer().is_err());
    }
}
