//! ChannelSink node - hands every message to a crossbeam channel.
//!
//! Lets code outside the pipeline (another thread, a test) consume messages
//! without implementing [`Listener`] itself.

use crate::error::{EmuError, Result};
use crate::pipeline::broadcast::Listener;
use crossbeam_channel::{Receiver, Sender};

pub struct ChannelSink<M> {
    sender: Sender<M>,
    sent: u64,
}

impl<M: Clone + Send> ChannelSink<M> {
    pub fn new(sender: Sender<M>) -> Self {
        Self { sender, sent: 0 }
    }

    /// Sink plus the receiving end of a fresh unbounded channel.
    pub fn unbounded() -> (Self, Receiver<M>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    /// Sink plus the receiving end of a bounded channel; sends block when full.
    pub fn bounded(capacity: usize) -> (Self, Receiver<M>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl<M: Clone + Send> Listener<M> for ChannelSink<M> {
    fn receive(&mut self, msg: &M) -> Result<()> {
        self.sender
            .send(msg.clone())
            .map_err(|_| EmuError::Channel("receiver dropped".to_string()))?;
        self.sent += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "ChannelSink"
    }
}
