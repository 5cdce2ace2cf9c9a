//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::{ByteSource, TransportCallback, TransportEvent};
use tracing::{debug, info, instrument, trace, warn};

use crate::config::{IngestionConfig, IngestionMetrics};
use crate::error::{IngestionError, Result};

/// Transport event tagged with the source that produced it
#[derive(Debug, Clone)]
pub struct SourceEvent {
    pub source_id: Arc<str>,
    pub event: TransportEvent,
    /// Data from this source was dropped right before this event; any
    /// partial frame buffered for it is no longer contiguous.
    pub after_gap: bool,
}

impl SourceEvent {
    pub fn new(source_id: impl Into<Arc<str>>, event: TransportEvent) -> Self {
        Self {
            source_id: source_id.into(),
            event,
            after_gap: false,
        }
    }
}

/// Ingestion Pipeline
///
/// Owns the registered byte sources and funnels their events into one
/// bounded channel, preserving per-source arrival order.
pub struct IngestionPipeline {
    /// Registered sources
    sources: HashMap<String, Arc<dyn ByteSource>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Event sender (shared by all source callbacks)
    tx: Sender<SourceEvent>,

    /// Event receiver
    rx: Option<Receiver<SourceEvent>>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(&IngestionConfig {
            channel_capacity,
            ..Default::default()
        })
    }

    /// Create with custom configuration
    pub fn with_config(config: &IngestionConfig) -> Self {
        let (tx, rx) = bounded(config.channel_capacity.max(1));

        Self {
            sources: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
        }
    }

    /// Register a byte source under its own ID
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source),
        fields(source = %source.source_id(), kind = %source.kind())
    )]
    pub fn register_source(&mut self, source: Arc<dyn ByteSource>) {
        let source_id = source.source_id().to_string();
        debug!(source = %source_id, "registered byte source");
        self.sources.insert(source_id, source);
    }

    /// Callback that forwards a source's events into the pipeline channel
    ///
    /// `Data` is never blocked on: when the channel is full the chunk is
    /// dropped, counted, and the next delivered event is flagged
    /// `after_gap`. `Opened`, `Error` and `Closed` wait for room.
    pub fn callback_for(&self, source_id: &str) -> TransportCallback {
        let tx = self.tx.clone();
        let metrics = self.metrics.clone();
        let source_id: Arc<str> = Arc::from(source_id);
        let gap = Arc::new(AtomicBool::new(false));

        Arc::new(move |event| {
            let is_data = matches!(event, TransportEvent::Data(_));
            let event = SourceEvent {
                source_id: source_id.clone(),
                event,
                after_gap: gap.load(Ordering::Acquire),
            };

            let sent = match tx.try_send(event) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(dropped)) if is_data => {
                    gap.store(true, Ordering::Release);
                    metrics.record_dropped();
                    trace!(source = %dropped.source_id, "data dropped (channel full)");
                    return;
                }
                Err(TrySendError::Full(event)) => {
                    trace!(source = %event.source_id, "channel full, waiting to deliver control event");
                    tx.send_blocking(event).map_err(|_| ())
                }
                Err(TrySendError::Closed(_)) => Err(()),
            };

            match sent {
                Ok(()) => {
                    gap.store(false, Ordering::Release);
                    metrics.record_event();
                    metrics.update_queue_len(tx.len());
                }
                Err(()) => warn!(source = %source_id, "event channel closed"),
            }
        })
    }

    /// Start all registered sources
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.sources.len(), "starting all byte sources");
        for (source_id, source) in &self.sources {
            self.start_source_inner(source_id, source.as_ref());
        }
    }

    /// Start one registered source
    pub fn start_source(&self, source_id: &str) -> Result<()> {
        let source = self
            .sources
            .get(source_id)
            .ok_or_else(|| IngestionError::UnknownSource {
                source_id: source_id.to_string(),
            })?;
        self.start_source_inner(source_id, source.as_ref());
        Ok(())
    }

    /// Stop all sources
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.sources.len(), "stopping all byte sources");
        for (source_id, source) in &self.sources {
            if source.is_listening() {
                debug!(source = %source_id, "stopping source");
                source.stop();
            }
        }
    }

    fn start_source_inner(&self, source_id: &str, source: &dyn ByteSource) {
        if !source.is_listening() {
            debug!(source = %source_id, "starting source");
            source.listen(self.callback_for(source_id));
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<SourceEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Look up a registered source
    pub fn source(&self, source_id: &str) -> Option<Arc<dyn ByteSource>> {
        self.sources.get(source_id).cloned()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Check if specified source is listening
    pub fn is_source_listening(&self, source_id: &str) -> bool {
        self.sources
            .get(source_id)
            .map(|s| s.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
