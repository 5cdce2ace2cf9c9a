//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! A slow or failing sink only ever loses its own batches; the dispatcher
//! never waits on it.

use std::sync::Arc;

use contracts::{PublicationBatch, StateSink};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::metrics::SinkMetrics;

pub struct SinkHandle {
    tx: mpsc::Sender<PublicationBatch>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Start a worker that owns `sink` and drains a queue of `queue_capacity` batches
    pub fn spawn<S: StateSink + Send + 'static>(sink: S, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new(sink.name()));
        let worker = tokio::spawn(drain_into_sink(sink, rx, metrics.clone()));

        Self {
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        self.metrics.sink()
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue a batch without waiting; `false` if it was dropped
    pub fn try_send(&self, batch: PublicationBatch) -> bool {
        match self.tx.try_send(batch) {
            Ok(()) => {
                self.metrics
                    .set_queued(self.tx.max_capacity() - self.tx.capacity());
                true
            }
            Err(TrySendError::Full(batch)) => {
                self.metrics.record_dropped(batch.len());
                warn!(
                    sink = %self.name(),
                    source = %batch.source_id,
                    publications = batch.len(),
                    "Sink queue full, batch dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!(sink = %self.name(), "Sink worker is gone");
                false
            }
        }
    }

    /// Close the queue and wait until the worker has flushed and closed the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name()))]
    pub async fn shutdown(self) {
        let Self {
            tx,
            metrics,
            worker,
        } = self;
        drop(tx);
        if let Err(e) = worker.await {
            error!(sink = %metrics.sink(), error = ?e, "Sink worker panicked");
        }
    }
}

async fn drain_into_sink<S: StateSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<PublicationBatch>,
    metrics: Arc<SinkMetrics>,
) {
    debug!(sink = %metrics.sink(), "Sink worker started");

    while let Some(batch) = rx.recv().await {
        metrics.set_queued(rx.len());
        match sink.write(&batch).await {
            Ok(()) => metrics.record_written(batch.len()),
            Err(e) => {
                metrics.record_failure();
                error!(
                    sink = %metrics.sink(),
                    source = %batch.source_id,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %metrics.sink(), error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %metrics.sink(), error = %e, "Close failed on shutdown");
    }
    debug!(sink = %metrics.sink(), stats = ?metrics.stats(), "Sink worker stopped");
}
