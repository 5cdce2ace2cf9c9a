//! # Ingestion Pipeline
//!
//! Byte ingestion and frame decoding module.
//!
//! Responsibilities:
//! - Register byte sources (serial, UDP test mode, mock)
//! - Recover 20-byte frames from the byte stream (`FrameResynchronizer`)
//! - Decode frame payloads into `DecodedSample`
//! - Per-connection decode sessions, reset on open/error/close
//! - Reopen dropped serial ports (`ReconnectSupervisor`)
//! - Port listing and baud-rate probing
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{DecodeSession, IngestionPipeline, SerialSource};
//! use std::sync::Arc;
//!
//! let mut pipeline = IngestionPipeline::new(1024);
//! pipeline.register_source(Arc::new(SerialSource::new("/dev/ttyUSB0", 9600)));
//! pipeline.start_all();
//!
//! let rx = pipeline.take_receiver().unwrap();
//! let mut session = DecodeSession::new("/dev/ttyUSB0");
//! while let Ok(event) = rx.recv().await {
//!     for sample in session.handle(&event).samples {
//!         // Evaluate publication policy
//!     }
//! }
//! ```

mod config;
mod decode;
mod error;
mod pipeline;
mod probe;
mod resync;
mod session;
mod sources;
mod supervisor;

// Re-exports
pub use config::{IngestionConfig, IngestionMetrics, MetricsSnapshot, DEFAULT_CHANNEL_CAPACITY};
pub use decode::{
    decode, decode_frame, encode_raw, raw_fields, sign_int16, ACCEL_SCALE, ANGLE_SCALE,
    FIELD_COUNT, GYRO_SCALE, RAW_FULL_SCALE,
};
pub use error::{IngestionError, Result};
pub use pipeline::{IngestionPipeline, SourceEvent};
pub use probe::{probe_port, probe_reader, ProbeReport, DEFAULT_PROBE_WAIT};
pub use resync::FrameResynchronizer;
pub use session::{DecodeSession, SessionUpdate};
pub use sources::{list_ports, MockByteConfig, MockByteSource, PortInfo, SerialSource, UdpSource};
pub use supervisor::{ReconnectSupervisor, DEFAULT_RECONNECT_INTERVAL};
