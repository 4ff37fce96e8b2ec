//! Echo node - prints each message as a line and passes it on.

use crate::error::{Result, ResultExt};
use crate::pipeline::broadcast::{Broadcaster, Listener, Producer};
use std::fmt::Display;
use std::io::{self, Stdout, Write};

pub struct Echo<M, W = Stdout> {
    writer: W,
    lines: u64,
    output: Broadcaster<M>,
}

impl<M> Echo<M, Stdout> {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl<M, W: Write> Echo<M, W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            lines: 0,
            output: Broadcaster::new(),
        }
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<M, W> Listener<M> for Echo<M, W>
where
    M: Display,
    W: Write + Send,
{
    fn receive(&mut self, msg: &M) -> Result<()> {
        writeln!(self.writer, "{}", msg)
            .and_then(|_| self.writer.flush())
            .context("Echo failed to write")?;
        self.lines += 1;
        self.output.broadcast(msg)
    }

    fn name(&self) -> &str {
        "Echo"
    }
}

impl<M, W> Producer<M> for Echo<M, W> {
    fn output(&self) -> &Broadcaster<M> {
        &self.output
    }
}
