//! Built-in pipeline stages.
//!
//! Transforms are both [`Listener`](crate::pipeline::Listener) and
//! [`Producer`](crate::pipeline::Producer); terminal sinks only listen.

pub mod annotation_formatter;
pub mod channel_sink;
pub mod csv_formatter;
pub mod decoder;
pub mod echo_sink;
pub mod file_logger_sink;
pub mod json_formatter;

pub use annotation_formatter::AnnotationFormatter;
pub use channel_sink::ChannelSink;
pub use csv_formatter::{csv_line, CsvFormatter};
pub use decoder::FragmentDecoder;
pub use echo_sink::Echo;
pub use file_logger_sink::{FileLogger, LogRotation};
pub use json_formatter::JsonFormatter;
