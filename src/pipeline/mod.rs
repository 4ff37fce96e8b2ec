//! Stage-based telemetry pipeline.
//!
//! Every stage owns a [`Broadcaster`] for its output and implements
//! [`Listener`] for its input. Stages are wired once at start-up with
//! [`attach`] / [`Pipe::pipe`]; a [`Source`] thread then drives each raw line
//! synchronously through everything reachable from it.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Coalescer] ──► [FragmentDecoder] ──► [CsvFormatter] ──► [FileLogger] ──► [Echo]
//!                                                └─► [JsonFormatter] ──► [ChannelSink]
//! ```

pub mod broadcast;
pub mod compose;
pub mod framer;
pub mod nodes;
pub mod source;

pub use broadcast::{lock, shared, Broadcaster, Listener, Producer, Shared, Subscriber};
pub use compose::{attach, Pipe};
pub use framer::{Coalescer, FramerMode, DEFAULT_MAX_FRAGMENT_BYTES};
pub use source::{
    CancelToken, ExitReason, FailureReporter, ReaderExit, ReaderHandle, Source, SourceState,
    TracingReporter,
};
