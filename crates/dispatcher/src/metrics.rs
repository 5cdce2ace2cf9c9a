//! Per-sink delivery counters
//!
//! Every update is mirrored to the `metrics` facade under the sink's name,
//! so Prometheus and the end-of-run summary read the same numbers.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Delivery counters of one sink
#[derive(Debug)]
pub struct SinkMetrics {
    sink: String,
    queued: AtomicUsize,
    batches_written: AtomicU64,
    publications_written: AtomicU64,
    failures: AtomicU64,
    batches_dropped: AtomicU64,
    publications_dropped: AtomicU64,
}

impl SinkMetrics {
    pub fn new(sink: impl Into<String>) -> Self {
        Self {
            sink: sink.into(),
            queued: AtomicUsize::new(0),
            batches_written: AtomicU64::new(0),
            publications_written: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
            publications_dropped: AtomicU64::new(0),
        }
    }

    pub fn sink(&self) -> &str {
        &self.sink
    }

    /// Batches waiting in the sink's queue
    pub fn set_queued(&self, depth: usize) {
        self.queued.store(depth, Ordering::Relaxed);
    }

    pub fn record_written(&self, publications: usize) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.publications_written
            .fetch_add(publications as u64, Ordering::Relaxed);
        metrics::counter!("witmotion_sink_writes_total", "sink" => self.sink.clone()).increment(1);
        metrics::counter!("witmotion_sink_publications_total", "sink" => self.sink.clone())
            .increment(publications as u64);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("witmotion_sink_failures_total", "sink" => self.sink.clone())
            .increment(1);
    }

    /// A batch was refused because the queue was full
    pub fn record_dropped(&self, publications: usize) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
        self.publications_dropped
            .fetch_add(publications as u64, Ordering::Relaxed);
        metrics::counter!("witmotion_sink_dropped_total", "sink" => self.sink.clone())
            .increment(1);
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            sink: self.sink.clone(),
            queued: self.queued.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            publications_written: self.publications_written.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            publications_dropped: self.publications_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub sink: String,
    pub queued: usize,
    pub batches_written: u64,
    pub publications_written: u64,
    pub failures: u64,
    pub batches_dropped: u64,
    pub publications_dropped: u64,
}

impl SinkStats {
    /// Share of offered publications that were written, in percent
    pub fn delivery_rate(&self) -> f64 {
        let offered = self.publications_written + self.publications_dropped;
        if offered == 0 {
            return 100.0;
        }
        self.publications_written as f64 / offered as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_batches_and_publications() {
        let metrics = SinkMetrics::new("state");
        metrics.record_written(3);
        metrics.record_written(2);
        metrics.record_dropped(5);
        metrics.record_failure();
        metrics.set_queued(4);

        let stats = metrics.stats();
        assert_eq!(stats.sink, "state");
        assert_eq!(stats.batches_written, 2);
        assert_eq!(stats.publications_written, 5);
        assert_eq!(stats.batches_dropped, 1);
        assert_eq!(stats.publications_dropped, 5);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.queued, 4);
        assert!((stats.delivery_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_sink_reports_full_delivery() {
        assert_eq!(SinkMetrics::new("log").stats().delivery_rate(), 100.0);
    }
}
