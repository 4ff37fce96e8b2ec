//! FragmentDecoder node - complete XML fragment in, typed [`Record`] out.

use crate::error::Result;
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use crate::record::{Fragment, Record};
use crate::time::{self, Clock};

/// Decodes every fragment it receives and broadcasts the resulting record.
///
/// Unknown root names still produce a record ([`Record::Unrecognized`]);
/// only text with no root element at all is dropped, with a warning.
pub struct FragmentDecoder {
    clock: Clock,
    decoded: u64,
    dropped: u64,
    output: Broadcaster<Record>,
}

impl FragmentDecoder {
    pub fn new() -> Self {
        Self::with_clock(time::device_seconds_now)
    }

    /// Use `clock` for the device time stamped on records that carry none.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            decoded: 0,
            dropped: 0,
            output: Broadcaster::new(),
        }
    }

    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for FragmentDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener<String> for FragmentDecoder {
    fn receive(&mut self, xml: &String) -> Result<()> {
        let fragment = match Fragment::parse(xml) {
            Ok(fragment) => fragment,
            Err(e) => {
                self.dropped += 1;
                tracing::warn!("Dropping fragment: {}", e);
                return Ok(());
            }
        };
        let record = Record::decode(&fragment, (self.clock)());
        tracing::trace!("Decoded {}", record.tag());
        self.decoded += 1;
        self.output.broadcast(&record)
    }

    fn name(&self) -> &str {
        "FragmentDecoder"
    }
}

impl Producer<Record> for FragmentDecoder {
    fn output(&self) -> &Broadcaster<Record> {
        &self.output
    }
}
