//! Bridge orchestrator - coordinates all components.
//!
//! Byte sources feed one event queue. A single task owns a decode session
//! per source and the publish engine, so channel state needs no locking.
//! Batches leave through the dispatcher.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, ByteSource, Publication, PublicationBatch, TransportEvent};
use ingestion::{
    DecodeSession, IngestionMetrics, IngestionPipeline, ReconnectSupervisor, SerialSource,
    SourceEvent, UdpSource,
};
use dispatcher::{DispatcherBuilder, DispatcherConfig};
use publish_engine::{ChannelRegistry, PublishEngine};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The bridge configuration
    pub blueprint: BridgeBlueprint,

    /// Stop after this many decoded samples (None = unlimited)
    pub max_samples: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main bridge orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses or the sample
    /// limit is reached
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup byte sources
        info!("Setting up byte sources...");
        let mut ingestion = IngestionPipeline::new(self.config.buffer_size);
        let mut supervisor = None;

        if let Some(port) = blueprint
            .connection
            .serial_port
            .as_deref()
            .filter(|_| blueprint.has_serial())
        {
            let source: Arc<dyn ByteSource> =
                Arc::new(SerialSource::new(port, blueprint.connection.baud_rate));
            ingestion.register_source(source.clone());

            let interval = Duration::from_millis(blueprint.connection.reconnect_interval_ms);
            let callback = ingestion.callback_for(source.source_id());
            supervisor = Some(ReconnectSupervisor::spawn(source, callback, interval));

            info!(
                port = %port,
                baud_rate = blueprint.connection.baud_rate,
                reconnect_ms = blueprint.connection.reconnect_interval_ms,
                "Serial source configured"
            );
        }

        if blueprint.test_mode.enabled {
            let source = Arc::new(UdpSource::new(blueprint.test_mode.socket_addr()));
            let source_id = source.source_id().to_string();
            ingestion.register_source(source);
            ingestion
                .start_source(&source_id)
                .context("Failed to start UDP test source")?;

            info!(addr = %blueprint.test_mode.socket_addr(), "UDP test source listening");
        }

        let active_sources = ingestion.source_count();
        if active_sources == 0 {
            return Err(CliError::NoTransport.into());
        }

        // Setup Publish Engine
        let registry = ChannelRegistry::new(blueprint.to_registry_config());
        let engine = PublishEngine::new(registry);

        // Setup Dispatcher
        info!("Setting up dispatcher...");
        let (batch_tx, batch_rx) = mpsc::channel::<PublicationBatch>(self.config.buffer_size.max(1));

        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - publications will be dropped");
        }

        let dispatcher = DispatcherBuilder::new(
            DispatcherConfig {
                sinks: blueprint.sinks.clone(),
            },
            batch_rx,
        )
        .with_registry(blueprint.to_registry_config())
        .build()
        .await
        .context("Failed to create dispatcher")?;

        let active_sinks = dispatcher.sink_count();
        let sink_metrics = dispatcher.sink_metrics();
        let dispatcher_handle = dispatcher.spawn();

        info!(active_sinks, "Dispatcher started");

        let event_rx = ingestion
            .take_receiver()
            .ok_or_else(|| CliError::pipeline_execution("event receiver already taken"))?;

        let mut processor = BridgeProcessor::new(engine, ingestion.metrics());
        let mut stats = PipelineStats {
            active_sources,
            active_sinks,
            ..Default::default()
        };

        info!(max_samples = ?self.config.max_samples, "Bridge running");

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut deadline => {
                    warn!(timeout = ?timeout, "Bridge timed out");
                    break;
                }
                event = event_rx.recv() => match event {
                    Ok(event) => event,
                    Err(_) => {
                        info!("Event channel closed");
                        break;
                    }
                },
            };

            observability::record_queue_depth(event_rx.len());
            stats.events_processed += 1;

            let started = Instant::now();
            let batch = processor.handle(&event, now_ms());
            observability::record_processing_latency_us(started.elapsed().as_secs_f64() * 1e6);

            if let Some(batch) = batch {
                stats.record_batch(&batch);
                if batch_tx.send(batch).await.is_err() {
                    warn!("Dispatcher channel closed");
                    break;
                }
            }

            if let Some(max) = self.config.max_samples {
                if processor.samples() >= max {
                    info!(samples = processor.samples(), "Reached max samples limit");
                    break;
                }
            }
        }

        // Shutdown
        info!("Shutting down bridge...");
        if let Some(supervisor) = supervisor {
            stats.open_attempts = supervisor.attempts();
            supervisor.shutdown().await;
        }
        ingestion.stop_all();

        if let Some(batch) = processor.disconnect_all(now_ms()) {
            stats.record_batch(&batch);
            if batch_tx.send(batch).await.is_err() {
                warn!("Dispatcher channel closed before disconnect was published");
            }
        }
        drop(batch_tx);

        // Wait for dispatcher to flush
        if tokio::time::timeout(Duration::from_secs(5), dispatcher_handle)
            .await
            .is_err()
        {
            warn!("Dispatcher did not finish within 5s");
        }

        stats.sinks = sink_metrics.iter().map(|m| m.stats()).collect();
        stats.samples_decoded = processor.samples();
        stats.engine = processor.engine().stats();
        stats.ingestion = ingestion.metrics().snapshot();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            rate = format!("{:.2}", stats.sample_rate()),
            "Bridge shutdown complete"
        );

        Ok(stats)
    }
}

/// Turns source events into publication batches
///
/// One decode session per source; one publish engine shared by all of them.
///
/// `info.connection` is a single state: it reads 1 while any source is live.
pub(crate) struct BridgeProcessor {
    sessions: HashMap<Arc<str>, DecodeSession>,
    engine: PublishEngine,
    metrics: Arc<IngestionMetrics>,
    samples: u64,
    connected: bool,
}

impl BridgeProcessor {
    pub(crate) fn new(engine: PublishEngine, metrics: Arc<IngestionMetrics>) -> Self {
        Self {
            sessions: HashMap::new(),
            engine,
            metrics,
            samples: 0,
            connected: false,
        }
    }

    /// Decoded samples so far
    pub(crate) fn samples(&self) -> u64 {
        self.samples
    }

    pub(crate) fn engine(&self) -> &PublishEngine {
        &self.engine
    }

    /// Handle one event; `None` when nothing is to be published
    pub(crate) fn handle(&mut self, event: &SourceEvent, now_ms: u64) -> Option<PublicationBatch> {
        let metrics = &self.metrics;
        let session = self
            .sessions
            .entry(event.source_id.clone())
            .or_insert_with(|| DecodeSession::with_metrics(event.source_id.as_ref(), metrics.clone()));

        let update = session.handle(event);
        let mut publications = Vec::new();

        if let Some(connected) = update.connection {
            info!(source = %event.source_id, connected, "Source connection changed");
            publications.extend(self.refresh_connection(now_ms));
        }

        for sample in &update.samples {
            self.samples += 1;
            publications.extend(self.engine.process(sample, now_ms));
        }

        if publications.is_empty() {
            return None;
        }

        debug!(
            source = %event.source_id,
            samples = update.samples.len(),
            publications = publications.len(),
            "Batch ready"
        );
        Some(PublicationBatch::new(event.source_id.as_ref(), now_ms, publications))
    }

    /// Close every session; reports the indicator dropping to 0 if it was up
    pub(crate) fn disconnect_all(&mut self, now_ms: u64) -> Option<PublicationBatch> {
        for session in self.sessions.values_mut() {
            session.handle_event(&TransportEvent::Closed);
        }
        self.refresh_connection(now_ms)
            .map(|publication| PublicationBatch::new("bridge", now_ms, vec![publication]))
    }

    /// Re-derive the indicator from all sessions, publishing only on change
    fn refresh_connection(&mut self, now_ms: u64) -> Option<Publication> {
        let connected = self.sessions.values().any(DecodeSession::is_connected);
        if connected == self.connected {
            return None;
        }
        self.connected = connected;
        info!(connected, "Bridge connection indicator changed");
        Some(Publication::connection(connected, now_ms))
    }
}

/// Wall-clock milliseconds since the Unix epoch
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
