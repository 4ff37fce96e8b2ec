//! # emu-telemetry: EMU-2 energy monitor telemetry pipeline
//!
//! Reads the XML telemetry stream of a Rainforest EMU-2 (or a replay file, or a
//! simulated device), reassembles complete fragments from arbitrarily split
//! lines, decodes them into typed records and fans them out to loggers,
//! console echo and channels.
//!
//! ## Architecture
//!
//! - **Pipeline**: stages connected by synchronous broadcast nodes
//! - **Source**: one background reader thread per device, cooperative stop
//! - **Framer**: chunk-independent fragment reassembly
//! - **Records**: closed enum of known fragment types plus `Unrecognized`
//!
//! ## Configuration
//!
//! Settings live in `emu-telemetry/config.toml` under the platform config
//! directory; see [`config`].
//!
//! ## Example
//!
//! ```ignore
//! use emu_telemetry::{
//!     device::FileConnector,
//!     pipeline::{nodes::{CsvFormatter, Echo, FragmentDecoder}, shared, Coalescer, Pipe, Source},
//! };
//!
//! let source = shared(Source::new(FileConnector::new("capture.log")));
//! source
//!     .pipe(shared(Coalescer::new()))
//!     .pipe(shared(FragmentDecoder::new()))
//!     .pipe(shared(CsvFormatter::new()))
//!     .pipe(shared(Echo::stdout()));
//!
//! let handle = source.lock().unwrap().start()?;
//! handle.join();
//! ```

pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod time;

// Re-export commonly used types
pub use command::Command;
pub use config::AppConfig;
pub use error::{EmuError, Result};
pub use pipeline::{attach, shared, Coalescer, Listener, Pipe, Producer, Shared, Source};
pub use record::Record;
