//! Ingestion configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Default capacity of the shared event channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default blocking read timeout of serial reader threads
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Event channel capacity; events beyond it are dropped and counted
    pub channel_capacity: usize,

    /// Serial read timeout (bounds how quickly a stopped reader exits)
    pub read_timeout: Duration,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Transport events accepted into the channel
    pub events_received: AtomicU64,

    /// Transport events dropped because the channel was full
    pub events_dropped: AtomicU64,

    /// Raw bytes fed to decode sessions
    pub bytes_received: AtomicU64,

    /// Frames recovered and decoded
    pub frames_decoded: AtomicU64,

    /// Bytes discarded by resynchronization or reset
    pub bytes_discarded: AtomicU64,

    /// Resynchronizer resets (open/error/close)
    pub resets: AtomicU64,

    /// Transport errors reported by sources
    pub transport_errors: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bytes(&self, count: usize) {
        self.bytes_received
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_frames(&self, count: usize) {
        self.frames_decoded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_discarded(&self, count: u64) {
        self.bytes_discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_reset(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_received: self.events_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            resets: self.resets.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_received: u64,
    pub events_dropped: u64,
    pub bytes_received: u64,
    pub frames_decoded: u64,
    pub bytes_discarded: u64,
    pub resets: u64,
    pub transport_errors: u64,
    pub queue_len: usize,
}
