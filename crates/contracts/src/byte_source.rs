//! ByteSource trait - raw byte transport abstraction
//!
//! Serial ports, UDP sockets and mocks push connection events through a
//! callback. Consumers own the decoding state; sources never parse bytes.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Connection event pushed by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection became live; any partial frame must be discarded
    Opened,
    /// A chunk of raw bytes in arrival order
    Data(Bytes),
    /// Transport failure; the source stops listening afterwards
    Error(String),
    /// Connection closed
    Closed,
}

impl TransportEvent {
    /// Whether this event invalidates buffered partial frames
    pub fn resets_stream(&self) -> bool {
        !matches!(self, TransportEvent::Data(_))
    }
}

/// Transport event callback
///
/// Uses `Arc` to allow callback sharing across reader threads and tasks.
pub type TransportCallback = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Serial,
    Udp,
    Mock,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Serial => "serial",
            SourceKind::Udp => "udp",
            SourceKind::Mock => "mock",
        })
    }
}

/// Raw byte source
///
/// # Example
///
/// ```ignore
/// let source: Arc<dyn ByteSource> = make_source();
/// source.listen(Arc::new(|event| {
///     if let TransportEvent::Data(chunk) = event {
///         println!("{} bytes", chunk.len());
///     }
/// }));
/// // ...
/// source.stop();
/// ```
pub trait ByteSource: Send + Sync {
    /// Stable identifier (port path, bind address, ...)
    fn source_id(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// Open the transport and start delivering events
    ///
    /// Calling while already listening is a no-op. Open failures are
    /// reported through the callback as `Error` followed by `Closed`.
    fn listen(&self, callback: TransportCallback);

    /// Stop delivering events and release the transport
    fn stop(&self);

    /// Whether the transport is currently open
    fn is_listening(&self) -> bool;
}
