//! Bridge metrics collection
//!
//! Facade recording helpers plus an in-memory aggregator for the shutdown
//! summary.

use std::collections::BTreeMap;

use contracts::{PublicationBatch, CONNECTION_STATE_ID};
use metrics::{counter, gauge, histogram};

/// Record one dispatched publication batch
///
/// Call once per batch handed to the dispatcher.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_publication_batch;
///
/// let batch = PublicationBatch::new(source_id, now_ms, publications);
/// record_publication_batch(&batch);
/// dispatcher_tx.try_send(batch)?;
/// ```
pub fn record_publication_batch(batch: &PublicationBatch) {
    counter!("witmotion_batches_total", "source" => batch.source_id.clone()).increment(1);
    histogram!("witmotion_batch_size").record(batch.len() as f64);

    for publication in &batch.publications {
        if publication.state_id == CONNECTION_STATE_ID {
            record_connection_state(&batch.source_id, publication.value > 0.5);
            continue;
        }
        gauge!("witmotion_state_value", "state" => publication.state_id.clone())
            .set(publication.value);
    }
}

/// Record the connection indicator of a source
pub fn record_connection_state(source_id: &str, connected: bool) {
    gauge!("witmotion_connected", "source" => source_id.to_string())
        .set(if connected { 1.0 } else { 0.0 });
    if !connected {
        counter!("witmotion_disconnects_total", "source" => source_id.to_string()).increment(1);
    }
}

/// Record time spent decoding and evaluating one source event
pub fn record_processing_latency_us(latency_us: f64) {
    histogram!("witmotion_processing_latency_us").record(latency_us);
}

/// Record depth of the pipeline event queue
pub fn record_queue_depth(depth: usize) {
    gauge!("witmotion_event_queue_depth").set(depth as f64);
}

/// Publication aggregator
///
/// Aggregates in memory so a summary can be printed at shutdown.
#[derive(Debug, Clone, Default)]
pub struct BridgeMetricsAggregator {
    /// Batches seen
    pub total_batches: u64,

    /// Value publications seen
    pub total_values: u64,

    /// Average publications seen
    pub total_averages: u64,

    /// Transitions of the connection indicator to 0
    pub disconnects: u64,

    /// Published value statistics per state id
    pub state_stats: BTreeMap<String, RunningStats>,
}

impl BridgeMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one batch into the totals
    pub fn update(&mut self, batch: &PublicationBatch) {
        self.total_batches += 1;

        for publication in &batch.publications {
            if publication.state_id == CONNECTION_STATE_ID {
                if publication.value < 0.5 {
                    self.disconnects += 1;
                }
                continue;
            }

            if publication.is_average {
                self.total_averages += 1;
            } else {
                self.total_values += 1;
            }

            self.state_stats
                .entry(publication.state_id.clone())
                .or_default()
                .push(publication.value);
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_batches: self.total_batches,
            total_values: self.total_values,
            total_averages: self.total_averages,
            disconnects: self.disconnects,
            states: self
                .state_stats
                .iter()
                .map(|(id, stats)| (id.clone(), StatsSummary::from(stats)))
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary report
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_batches: u64,
    pub total_values: u64,
    pub total_averages: u64,
    pub disconnects: u64,
    pub states: BTreeMap<String, StatsSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Publication Summary ===")?;
        writeln!(f, "Batches: {}", self.total_batches)?;
        writeln!(f, "Values published: {}", self.total_values)?;
        writeln!(f, "Averages published: {}", self.total_averages)?;
        writeln!(f, "Disconnects: {}", self.disconnects)?;

        if !self.states.is_empty() {
            writeln!(f, "States:")?;
            for (state, stats) in &self.states {
                writeln!(f, "  {}: {}", state, stats)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
