//! JsonFormatter node - one JSON object per record, tagged by `type`.

use crate::error::{EmuError, Result};
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use crate::record::Record;

#[derive(Default)]
pub struct JsonFormatter {
    output: Broadcaster<String>,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Listener<Record> for JsonFormatter {
    fn receive(&mut self, record: &Record) -> Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| EmuError::stage("JsonFormatter", e.to_string()))?;
        self.output.broadcast(&line)
    }

    fn name(&self) -> &str {
        "JsonFormatter"
    }
}

impl Producer<String> for JsonFormatter {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}
