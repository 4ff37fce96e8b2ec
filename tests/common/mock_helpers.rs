//! Stage and channel helpers for pipeline tests

use crossbeam_channel::{unbounded, Receiver};
use emu_telemetry::pipeline::nodes::ChannelSink;
use emu_telemetry::pipeline::{Broadcaster, Listener, Producer};
use emu_telemetry::record::Record;
use emu_telemetry::Result;
use std::time::Duration;

/// Channel sink plus its receiver
pub fn channel_sink<M: Clone + Send>() -> (ChannelSink<M>, Receiver<M>) {
    let (tx, rx) = unbounded();
    (ChannelSink::new(tx), rx)
}

/// Collect everything currently queued, waiting briefly for stragglers.
pub fn drain<M>(rx: &Receiver<M>) -> Vec<M> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.recv_timeout(Duration::from_millis(50)) {
        out.push(msg);
    }
    out
}

/// Formatter emitting `"<tag>,<demand>"` for demand records and `"<tag>,"` otherwise
#[derive(Default)]
pub struct TagDemandFormatter {
    output: Broadcaster<String>,
}

impl Listener<Record> for TagDemandFormatter {
    fn receive(&mut self, record: &Record) -> Result<()> {
        let line = match record {
            Record::InstantaneousDemand(d) => format!("{},{}", record.tag(), d.value()),
            other => format!("{},", other.tag()),
        };
        self.output.broadcast(&line)
    }
}

impl Producer<String> for TagDemandFormatter {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}
