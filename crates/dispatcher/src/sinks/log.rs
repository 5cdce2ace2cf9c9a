//! LogSink - logs publications via tracing

use contracts::{ContractError, PublicationBatch, StateSink};
use tracing::{debug, info, instrument};

/// Sink that logs publication batches for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_batch(&self, batch: &PublicationBatch) {
        let averages = batch.publications.iter().filter(|p| p.is_average).count();

        info!(
            sink = %self.name,
            source = %batch.source_id,
            timestamp_ms = batch.timestamp_ms,
            publications = batch.len(),
            averages,
            "Publications received"
        );

        for publication in &batch.publications {
            debug!(
                sink = %self.name,
                state = %publication.state_id,
                value = publication.value,
                "State updated"
            );
        }
    }
}

impl StateSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, batch),
        fields(sink = %self.name, source = %batch.source_id)
    )]
    async fn write(&mut self, batch: &PublicationBatch) -> Result<(), ContractError> {
        self.log_batch(batch);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
