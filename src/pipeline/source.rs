//! Source - background reader lifecycle.
//!
//! A [`Source`] owns one reader thread at a time. The thread pulls lines from a
//! [`LineDevice`] and broadcasts each one synchronously to everything attached
//! to the source, so a single read drives the whole reachable pipeline before
//! the next read starts.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted --start--> Running --stop--> Stopping --(loop exits)--> Stopped
//!                          |                                           ^
//!                          +---- end of input / read or stage error ---+
//! ```
//!
//! - `start()` opens a fresh device through the [`Connector`], mints a new
//!   [`CancelToken`] and cancels the previous one. Calling it while running is a
//!   restart: the old loop exits at its next iteration boundary and closes its
//!   own device.
//! - `stop()` cancels the current token and returns at once. A blocking read in
//!   progress is not interrupted; use [`ReaderHandle::join`] to wait.
//! - The device is closed exactly once per loop, on every exit path, by a guard
//!   owned by the reader thread.
//! - Read errors and downstream stage errors end the loop and are handed to the
//!   source's [`FailureReporter`]; they are never retried. A panic in the device
//!   or in a subscriber is caught and reported the same way.

use crate::device::{Connector, DeviceWriter, LineDevice, ReadOutcome};
use crate::error::{EmuError, Result, ResultExt};
use crate::pipeline::broadcast::{lock, Broadcaster, Listener, Producer};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Liveness token of one reader loop. Cancelling it asks the loop to exit.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Observable state of a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    NotStarted,
    Running,
    /// Stop requested; the loop has not noticed yet
    Stopping,
    Stopped,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::NotStarted => write!(f, "not started"),
            SourceState::Running => write!(f, "running"),
            SourceState::Stopping => write!(f, "stopping"),
            SourceState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why a reader loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The token was cancelled (stop or restart)
    Stopped,
    /// The device ran out of input
    EndOfInput,
    /// A read failed, a stage failed, or the thread panicked
    Failed(String),
}

impl ExitReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::Failed(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stopped => write!(f, "stopped"),
            ExitReason::EndOfInput => write!(f, "end of input"),
            ExitReason::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Outcome of one reader loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderExit {
    pub reason: ExitReason,
    /// Lines fully delivered to every subscriber
    pub delivered: u64,
}

/// Receives loop-terminating failures.
#[cfg_attr(test, mockall::automock)]
pub trait FailureReporter: Send + Sync {
    fn report(&self, source: &str, error: &EmuError);
}

/// Default reporter: logs through `tracing` inside the source's span.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, source: &str, error: &EmuError) {
        tracing::error!("Source {} failed: {}", source, error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "reader thread panicked".to_string())
}

/// Completion handle of one reader thread.
pub struct ReaderHandle {
    name: String,
    handle: JoinHandle<ReaderExit>,
}

impl ReaderHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the loop has exited and its device is closed.
    pub fn join(self) -> ReaderExit {
        match self.handle.join() {
            Ok(exit) => exit,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!("Reader {} panicked: {}", self.name, msg);
                ReaderExit {
                    reason: ExitReason::Failed(msg),
                    delivered: 0,
                }
            }
        }
    }
}

impl fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("name", &self.name)
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: SourceState,
    /// Incremented by every start; only the current loop may publish `Stopped`
    generation: u64,
}

/// Owns the opened device inside the reader thread and closes it on drop.
struct DeviceGuard<D: LineDevice> {
    device: D,
    lifecycle: Arc<Mutex<Lifecycle>>,
    generation: u64,
}

impl<D: LineDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.device.close();
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.generation == self.generation {
            lifecycle.state = SourceState::Stopped;
        }
    }
}

/// Everything the reader thread needs, moved into it by `start`.
struct ReaderLoop<D: LineDevice> {
    name: String,
    token: CancelToken,
    output: Arc<Broadcaster<String>>,
    reporter: Arc<dyn FailureReporter>,
    guard: DeviceGuard<D>,
}

impl<D: LineDevice> ReaderLoop<D> {
    fn run(self) -> ReaderExit {
        let span = tracing::info_span!("source", name = %self.name);
        let _entered = span.enter();
        let ReaderLoop {
            name,
            token,
            output,
            reporter,
            mut guard,
        } = self;

        let device = guard.device.describe();
        tracing::info!("Reader started on {}", device);
        let mut delivered = 0u64;

        let reason = loop {
            if token.is_cancelled() {
                break ExitReason::Stopped;
            }
            let read = panic::catch_unwind(AssertUnwindSafe(|| guard.device.read()))
                .unwrap_or_else(|payload| {
                    Err(EmuError::device(
                        &device,
                        format!("read panicked: {}", panic_message(payload.as_ref())),
                    ))
                });
            match read {
                Ok(ReadOutcome::Line(line)) => {
                    tracing::trace!("Read {} bytes", line.len());
                    let delivery = panic::catch_unwind(AssertUnwindSafe(|| output.broadcast(&line)))
                        .unwrap_or_else(|payload| {
                            Err(EmuError::stage(
                                "subscriber",
                                format!("panicked: {}", panic_message(payload.as_ref())),
                            ))
                        });
                    if let Err(e) = delivery {
                        reporter.report(&name, &e);
                        break ExitReason::Failed(e.to_string());
                    }
                    delivered += 1;
                }
                Ok(ReadOutcome::Nothing) => {}
                Ok(ReadOutcome::EndOfInput) => {
                    token.cancel();
                    break ExitReason::EndOfInput;
                }
                Err(e) => {
                    reporter.report(&name, &e);
                    break ExitReason::Failed(e.to_string());
                }
            }
        };

        drop(guard);
        tracing::info!("Reader exited ({}) after {} lines", reason, delivered);
        ReaderExit { reason, delivered }
    }
}

/// Background-thread-driven producer of raw lines.
pub struct Source<C: Connector> {
    name: String,
    connector: C,
    output: Arc<Broadcaster<String>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
    token: CancelToken,
    writer: Option<Box<dyn DeviceWriter>>,
    reporter: Arc<dyn FailureReporter>,
}

impl<C: Connector> Source<C> {
    pub fn new(connector: C) -> Self {
        Self {
            name: connector.name(),
            connector,
            output: Arc::new(Broadcaster::new()),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: SourceState::NotStarted,
                generation: 0,
            })),
            token: CancelToken::new(),
            writer: None,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Override the name used for the thread and log span.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> SourceState {
        lock(&self.lifecycle).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SourceState::Running
    }

    /// Open the device and spawn a new reader loop.
    ///
    /// Setup errors are returned and leave any previous loop untouched.
    pub fn start(&mut self) -> Result<ReaderHandle> {
        let mut device = self
            .connector
            .open()
            .with_context(|| format!("Failed to start {}", self.name))?;
        let writer = match device.writer() {
            Ok(writer) => writer,
            Err(e) => {
                device.close();
                return Err(e.with_context(format!("Failed to start {}", self.name)));
            }
        };

        let token = CancelToken::new();
        let previous = std::mem::replace(&mut self.token, token.clone());
        if lock(&self.lifecycle).state == SourceState::Running {
            tracing::info!("Restarting {}", self.name);
        }
        previous.cancel();

        let generation = {
            let mut lifecycle = lock(&self.lifecycle);
            lifecycle.generation += 1;
            lifecycle.state = SourceState::Running;
            lifecycle.generation
        };

        let reader = ReaderLoop {
            name: self.name.clone(),
            token,
            output: self.output.clone(),
            reporter: self.reporter.clone(),
            guard: DeviceGuard {
                device,
                lifecycle: self.lifecycle.clone(),
                generation,
            },
        };
        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || reader.run())
            .with_context(|| format!("Failed to spawn reader thread for {}", self.name))?;

        self.writer = writer;
        Ok(ReaderHandle {
            name: self.name.clone(),
            handle,
        })
    }

    /// Ask the current loop to exit at its next iteration boundary.
    pub fn stop(&mut self) {
        self.token.cancel();
        self.writer = None;
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.state == SourceState::Running {
            lifecycle.state = SourceState::Stopping;
            tracing::info!("Stopping {}", self.name);
        }
    }

    /// Forward an inbound message to the device's write half.
    pub fn write(&mut self, text: &str) -> Result<()> {
        if self.state() != SourceState::Running {
            self.writer = None;
            tracing::warn!("{} is not running, dropping write", self.name);
            return Ok(());
        }
        match self.writer.as_mut() {
            Some(writer) => writer.write(text),
            None => {
                tracing::debug!("{} has no write half, dropping write", self.name);
                Ok(())
            }
        }
    }
}

impl<C: Connector> Producer<String> for Source<C> {
    fn output(&self) -> &Broadcaster<String> {
        &self.output
    }
}

impl<C: Connector> Listener<String> for Source<C> {
    fn receive(&mut self, msg: &String) -> Result<()> {
        self.write(msg)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Connector> Drop for Source<C> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<C: Connector> fmt::Debug for Source<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("subscribers", &self.output.len())
            .finish()
    }
}
