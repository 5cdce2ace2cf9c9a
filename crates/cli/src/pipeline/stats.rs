//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::PublicationBatch;
use dispatcher::SinkStats;
use observability::BridgeMetricsAggregator;
use publish_engine::EngineStats;

/// Statistics from a bridge run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Transport events taken off the queue
    pub events_processed: u64,

    /// Samples decoded from complete frames
    pub samples_decoded: u64,

    /// Batches handed to the dispatcher
    pub batches_dispatched: u64,

    /// Serial open attempts (initial open included)
    pub open_attempts: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Number of byte sources
    pub active_sources: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Policy engine totals
    pub engine: EngineStats,

    /// Ingestion counters
    pub ingestion: ingestion::MetricsSnapshot,

    /// Per-sink delivery counters, collected after the dispatcher drained
    pub sinks: Vec<SinkStats>,

    /// Publication aggregator
    pub publications: BridgeMetricsAggregator,
}

impl PipelineStats {
    /// Account for one dispatched batch
    pub fn record_batch(&mut self, batch: &PublicationBatch) {
        self.batches_dispatched += 1;
        observability::record_publication_batch(batch);
        self.publications.update(batch);
    }

    /// Decoded samples per second
    pub fn sample_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.samples_decoded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of evaluations that produced no publication, in percent
    pub fn suppression_rate(&self) -> f64 {
        if self.engine.evaluations > 0 {
            let suppressed =
                self.engine.suppressed_unchanged + self.engine.suppressed_rate_limited;
            suppressed as f64 / self.engine.evaluations as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Batches lost to full sink queues, across all sinks
    pub fn sink_drops(&self) -> u64 {
        self.sinks.iter().map(|s| s.batches_dropped).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Bridge Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events processed: {}", self.events_processed);
        println!("   ├─ Samples decoded: {}", self.samples_decoded);
        println!("   ├─ Sample rate: {:.2}/s", self.sample_rate());
        println!("   ├─ Active sources: {}", self.active_sources);
        println!("   ├─ Serial open attempts: {}", self.open_attempts);
        println!("   └─ Active sinks: {}", self.active_sinks);

        println!("\n🔌 Ingestion");
        println!("   ├─ Bytes received: {}", self.ingestion.bytes_received);
        println!("   ├─ Frames decoded: {}", self.ingestion.frames_decoded);
        println!("   ├─ Bytes discarded: {}", self.ingestion.bytes_discarded);
        println!("   ├─ Resync resets: {}", self.ingestion.resets);
        println!("   ├─ Transport errors: {}", self.ingestion.transport_errors);
        println!("   └─ Events dropped: {}", self.ingestion.events_dropped);

        println!("\n📈 Publication Policy");
        println!("   ├─ Evaluations: {}", self.engine.evaluations);
        println!("   ├─ Values published: {}", self.engine.values_published);
        println!("   ├─ Averages published: {}", self.engine.averages_published);
        println!(
            "   ├─ Suppressed (unchanged): {}",
            self.engine.suppressed_unchanged
        );
        println!(
            "   ├─ Suppressed (rate limited): {}",
            self.engine.suppressed_rate_limited
        );
        println!("   └─ Suppression rate: {:.2}%", self.suppression_rate());

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            let last = self.sinks.len() - 1;
            for (i, sink) in self.sinks.iter().enumerate() {
                let branch = if i == last { "└─" } else { "├─" };
                println!(
                    "   {} {}: {} written, {} dropped, {} failed ({:.1}% delivered)",
                    branch,
                    sink.sink,
                    sink.publications_written,
                    sink.publications_dropped,
                    sink.failures,
                    sink.delivery_rate()
                );
            }
        }

        println!("\n{}", self.publications.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Publication;

    #[test]
    fn test_rates_without_data() {
        let stats = PipelineStats::default();
        assert_eq!(stats.sample_rate(), 0.0);
        assert_eq!(stats.suppression_rate(), 0.0);
    }

    #[test]
    fn test_suppression_rate() {
        let stats = PipelineStats {
            engine: EngineStats {
                evaluations: 10,
                suppressed_unchanged: 3,
                suppressed_rate_limited: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!((stats.suppression_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_sink_drops_sum_over_sinks() {
        let stats = PipelineStats {
            sinks: vec![
                SinkStats {
                    sink: "log".to_string(),
                    batches_dropped: 2,
                    ..Default::default()
                },
                SinkStats {
                    sink: "file".to_string(),
                    batches_dropped: 3,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(stats.sink_drops(), 5);
    }

    #[test]
    fn test_record_batch() {
        let mut stats = PipelineStats::default();
        stats.record_batch(&PublicationBatch::new(
            "mock",
            0,
            vec![Publication::connection(true, 0)],
        ));
        assert_eq!(stats.batches_dispatched, 1);
        assert_eq!(stats.publications.total_batches, 1);
    }
}
