//! # Dispatcher
//!
//! Publication distribution module.
//!
//! Responsibilities:
//! - Consume `PublicationBatch`es
//! - Fan-out to multiple state sinks
//! - Isolate slow sinks so they never block the decode path

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{PublicationBatch, StateSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{SinkMetrics, SinkStats};
pub use sinks::{FileSink, LogSink, MemorySink, NetworkSink, StateStore, StoredState};
