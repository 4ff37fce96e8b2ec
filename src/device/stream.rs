//! Line devices over buffered readers: replay files and the console.

use super::{Connector, LineDevice, ReadOutcome};
use crate::error::{EmuError, Result, ResultExt};
use std::fs::File;
use std::io::{BufRead, BufReader, Stdin};
use std::path::{Path, PathBuf};

/// Read one line, strip its terminator, and map EOF to [`ReadOutcome::EndOfInput`].
///
/// Invalid UTF-8 is replaced rather than rejected; devices occasionally emit
/// stray bytes when the port is opened mid-transmission.
pub(crate) fn read_trimmed_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<ReadOutcome> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(ReadOutcome::EndOfInput);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(ReadOutcome::Line(String::from_utf8_lossy(&buf).into_owned()))
}

/// A device reading lines from any buffered reader.
pub struct StreamDevice<R> {
    label: String,
    reader: Option<R>,
    lines_read: u64,
}

impl<R: BufRead + Send> StreamDevice<R> {
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self {
            label: label.into(),
            reader: Some(reader),
            lines_read: 0,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl<R: BufRead + Send> LineDevice for StreamDevice<R> {
    fn read(&mut self) -> Result<ReadOutcome> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| EmuError::device(&self.label, "stream already closed"))?;
        let outcome = read_trimmed_line(reader)?;
        if matches!(outcome, ReadOutcome::Line(_)) {
            self.lines_read += 1;
        }
        Ok(outcome)
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            tracing::debug!("Closed {} after {} lines", self.label, self.lines_read);
        }
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Replays a captured log file one line per read.
#[derive(Debug, Clone)]
pub struct FileConnector {
    path: PathBuf,
}

impl FileConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for FileConnector {
    type Device = StreamDevice<BufReader<File>>;

    fn open(&self) -> Result<Self::Device> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        tracing::info!("Opened replay file {}", self.path.display());
        Ok(StreamDevice::new(
            format!("file:{}", self.path.display()),
            BufReader::new(file),
        ))
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string())
    }
}

/// Reads lines typed on the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConnector;

impl Connector for StdinConnector {
    type Device = StreamDevice<BufReader<Stdin>>;

    fn open(&self) -> Result<Self::Device> {
        Ok(StreamDevice::new("stdin", BufReader::new(std::io::stdin())))
    }

    fn name(&self) -> String {
        "stdin".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_read_trimmed_line_strips_terminators() {
        let mut cursor = Cursor::new(b"first\r\nsecond\n\nlast".to_vec());
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap(),
            ReadOutcome::Line("first".into())
        );
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap(),
            ReadOutcome::Line("second".into())
        );
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap(),
            ReadOutcome::Line(String::new())
        );
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap(),
            ReadOutcome::Line("last".into())
        );
        assert_eq!(
            read_trimmed_line(&mut cursor).unwrap(),
            ReadOutcome::EndOfInput
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut cursor = Cursor::new(vec![b'<', 0xff, b'>', b'\n']);
        match read_trimmed_line(&mut cursor).unwrap() {
            ReadOutcome::Line(line) => assert_eq!(line, "<\u{fffd}>"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_stream_device_counts_and_closes() {
        let mut device = StreamDevice::new("mem", Cursor::new(b"a\nb\n".to_vec()));
        device.read().unwrap();
        device.read().unwrap();
        assert_eq!(device.read().unwrap(), ReadOutcome::EndOfInput);
        assert_eq!(device.lines_read(), 2);

        device.close();
        assert!(device.read().is_err());
    }

    #[test]
    fn test_file_connector_opens_fresh_device_each_time() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "<A>").unwrap();
        writeln!(file, "</A>").unwrap();

        let connector = FileConnector::new(file.path());
        for _ in 0..2 {
            let mut device = connector.open().unwrap();
            assert_eq!(device.read().unwrap(), ReadOutcome::Line("<A>".into()));
        }
    }

    #[test]
    fn test_file_connector_missing_file() {
        let connector = FileConnector::new("/definitely/not/here.log");
        let err = connector.open().err().unwrap();
        assert!(err.to_string().contains("here.log"));
    }
}
