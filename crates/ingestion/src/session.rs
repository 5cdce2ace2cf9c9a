//! Per-connection decode session
//!
//! Owns one resynchronizer and turns transport events into decoded samples
//! plus connection-state changes. Sessions never share buffers.

use std::sync::Arc;

use contracts::{DecodedSample, TransportEvent};
use tracing::{debug, instrument, trace, warn};

use crate::config::IngestionMetrics;
use crate::decode::decode_frame;
use crate::pipeline::SourceEvent;
use crate::resync::FrameResynchronizer;

/// Result of handling one transport event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    /// Samples decoded from the event, in arrival order
    pub samples: Vec<DecodedSample>,

    /// New connection state, if it changed
    pub connection: Option<bool>,
}

/// Decoding state of one byte source
#[derive(Debug)]
pub struct DecodeSession {
    source_id: String,
    resync: FrameResynchronizer,
    connected: bool,
    metrics: Arc<IngestionMetrics>,
}

impl DecodeSession {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self::with_metrics(source_id, Arc::new(IngestionMetrics::new()))
    }

    pub fn with_metrics(source_id: impl Into<String>, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            source_id: source_id.into(),
            resync: FrameResynchronizer::new(),
            connected: false,
            metrics,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Bytes buffered towards the next frame
    pub fn pending_len(&self) -> usize {
        self.resync.pending_len()
    }

    /// Handle one event taken off the pipeline queue
    ///
    /// A partial frame left over from before a gap is discarded first.
    pub fn handle(&mut self, event: &SourceEvent) -> SessionUpdate {
        if event.after_gap && self.resync.pending_len() > 0 {
            debug!(
                source = %self.source_id,
                pending = self.resync.pending_len(),
                "data lost upstream, discarding partial frame"
            );
            self.reset();
        }
        self.handle_event(&event.event)
    }

    /// Handle one transport event
    ///
    /// `Opened`, `Error` and `Closed` discard any partial frame. The first
    /// data on a connection that never reported `Opened` marks it live.
    #[instrument(
        name = "decode_session_event",
        level = "trace",
        skip(self, event),
        fields(source = %self.source_id)
    )]
    pub fn handle_event(&mut self, event: &TransportEvent) -> SessionUpdate {
        match event {
            TransportEvent::Opened => {
                self.reset();
                debug!(source = %self.source_id, "connection opened");
                SessionUpdate {
                    samples: Vec::new(),
                    connection: self.set_connected(true),
                }
            }
            TransportEvent::Data(chunk) => {
                let connection = if self.connected {
                    None
                } else {
                    self.set_connected(true)
                };
                SessionUpdate {
                    samples: self.feed(chunk),
                    connection,
                }
            }
            TransportEvent::Error(message) => {
                self.reset();
                self.metrics.record_transport_error();
                warn!(source = %self.source_id, error = %message, "transport error");
                SessionUpdate {
                    samples: Vec::new(),
                    connection: self.set_connected(false),
                }
            }
            TransportEvent::Closed => {
                self.reset();
                debug!(source = %self.source_id, "connection closed");
                SessionUpdate {
                    samples: Vec::new(),
                    connection: self.set_connected(false),
                }
            }
        }
    }

    /// Feed raw bytes and decode every completed frame
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedSample> {
        let discarded_before = self.resync.discarded_bytes();
        let mut samples = Vec::new();
        self.resync
            .feed_with(bytes, |frame| samples.push(decode_frame(&frame)));

        self.metrics.record_bytes(bytes.len());
        self.metrics.record_frames(samples.len());
        self.metrics
            .record_discarded(self.resync.discarded_bytes() - discarded_before);
        metrics::counter!("witmotion_bytes_received_total", "source" => self.source_id.clone())
            .increment(bytes.len() as u64);
        if !samples.is_empty() {
            metrics::counter!("witmotion_frames_decoded_total", "source" => self.source_id.clone())
                .increment(samples.len() as u64);
        }

        trace!(
            source = %self.source_id,
            bytes = bytes.len(),
            frames = samples.len(),
            pending = self.resync.pending_len(),
            "fed chunk"
        );
        samples
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        let dropped = self.resync.reset();
        self.metrics.record_discarded(dropped as u64);
        self.metrics.record_reset();
        metrics::counter!("witmotion_resync_resets_total", "source" => self.source_id.clone())
            .increment(1);
    }

    fn set_connected(&mut self, connected: bool) -> Option<bool> {
        if self.connected == connected {
            return None;
        }
        self.connected = connected;
        Some(connected)
    }
}
