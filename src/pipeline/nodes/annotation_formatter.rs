//! AnnotationFormatter node - stamps free-form notes for the telemetry log.
//!
//! `"hello"` becomes `"<device seconds>, Annotation, hello"`.

use crate::error::Result;
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use crate::time::{self, Clock};

pub struct AnnotationFormatter {
    clock: Clock,
    output: Broadcaster<String>,
}

impl AnnotationFormatter {
    pub fn new() -> Self {
        Self::with_clock(time::device_seconds_now)
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            output: Broadcaster::new(),
        }
    }
}

impl Default for AnnotationFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener<String> for AnnotationFormatter {
    fn receive(&mut self, text: &String) -> Result<()> {
        let line = format!("{}, Annotation, {}", (self.clock)(), text);
        self.output.broadcast(&line)
    }

    fn name(&self) -> &str {
        "AnnotationFormatter"
    }
}

impl Producer<String> for AnnotationFormatter {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}
