//! Publication - Policy Engine output
//!
//! `(state_id, value, is_average)` tuples handed to state sinks, batched per
//! decoded sample.

use serde::{Deserialize, Serialize};

use crate::ChannelId;

/// State id of the connection indicator
pub const CONNECTION_STATE_ID: &str = "info.connection";

/// One value written to the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// `acceleration.x`, `angle.zAvg`, `info.connection`, ...
    pub state_id: String,

    /// Published value (after optional 360-normalization)
    pub value: f64,

    /// Whether this is a rolling average (`...Avg`)
    pub is_average: bool,

    /// Evaluation time (ms since Unix epoch)
    pub timestamp_ms: u64,
}

impl Publication {
    /// Instantaneous channel value
    pub fn value(channel: ChannelId, value: f64, timestamp_ms: u64) -> Self {
        Self {
            state_id: channel.state_id(),
            value,
            is_average: false,
            timestamp_ms,
        }
    }

    /// Rolling average of a channel
    pub fn average(channel: ChannelId, value: f64, timestamp_ms: u64) -> Self {
        Self {
            state_id: channel.average_state_id(),
            value,
            is_average: true,
            timestamp_ms,
        }
    }

    /// Connection indicator, encoded as 1.0 / 0.0
    pub fn connection(connected: bool, timestamp_ms: u64) -> Self {
        Self {
            state_id: CONNECTION_STATE_ID.to_string(),
            value: if connected { 1.0 } else { 0.0 },
            is_average: false,
            timestamp_ms,
        }
    }
}

/// Publications produced from one source event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationBatch {
    /// Source that produced the bytes
    pub source_id: String,

    /// Evaluation time (ms since Unix epoch)
    pub timestamp_ms: u64,

    /// Publications in emission order
    pub publications: Vec<Publication>,
}

impl PublicationBatch {
    pub fn new(source_id: impl Into<String>, timestamp_ms: u64, publications: Vec<Publication>) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp_ms,
            publications,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.publications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.publications.len()
    }
}
