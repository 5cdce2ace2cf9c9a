//! Publication policy
//!
//! Per-channel change detection, heartbeat suppression, rate limiting and a
//! time-windowed rolling average. Evaluation order:
//!
//! 1. Unchanged value within the heartbeat interval: drop, no mutation.
//! 2. Record the sample in history (not for the very first observation).
//! 3. Within `min_interval_ms` of the last publish: drop (history is kept).
//! 4. Prune history older than the window, publish its mean as the average.
//! 5. Publish the value and remember it as the last publish.

use std::collections::{HashMap, VecDeque};

use contracts::ChannelId;

/// Unchanged values are re-published after this long
pub const HEARTBEAT_INTERVAL_MS: u64 = 60_000;

/// Policy parameters of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySettings {
    /// Minimum time between instantaneous publications
    pub min_interval_ms: u64,
    /// Rolling-average window length
    pub window_ms: u64,
    /// Map negative outputs into 0..360
    pub normalize_360: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HistoryEntry {
    value: f64,
    timestamp_ms: u64,
}

/// Publication state of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    last_value: f64,
    last_publish_ms: u64,
    history: VecDeque<HistoryEntry>,
}

impl ChannelState {
    fn first(value: f64, now_ms: u64) -> Self {
        Self {
            last_value: value,
            last_publish_ms: now_ms,
            history: VecDeque::new(),
        }
    }

    pub fn last_value(&self) -> f64 {
        self.last_value
    }

    pub fn last_publish_ms(&self) -> u64 {
        self.last_publish_ms
    }

    /// Samples currently contributing to the average
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop the oldest contiguous run strictly older than `cutoff_ms`
    ///
    /// Scans newest to oldest and cuts at the first expired entry.
    fn prune(&mut self, cutoff_ms: u64) {
        if let Some(expired) = self
            .history
            .iter()
            .rposition(|entry| entry.timestamp_ms < cutoff_ms)
        {
            self.history.drain(..=expired);
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let sum: f64 = self.history.iter().map(|entry| entry.value).sum();
        Some(sum / self.history.len() as f64)
    }
}

/// Why an evaluation did or did not publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First observation of the channel: value only
    First,
    /// Value and average published
    Published,
    /// Unchanged within the heartbeat interval
    Unchanged,
    /// Within the minimum interval; sample kept for the average
    RateLimited,
}

/// Result of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyOutcome {
    pub decision: Decision,
    /// Instantaneous value to publish
    pub value: Option<f64>,
    /// Rolling average to publish
    pub average: Option<f64>,
}

impl PolicyOutcome {
    fn suppressed(decision: Decision) -> Self {
        Self {
            decision,
            value: None,
            average: None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.value.is_none() && self.average.is_none()
    }
}

#[inline]
fn normalize(value: f64, normalize_360: bool) -> f64 {
    if normalize_360 && value < 0.0 {
        value + 360.0
    } else {
        value
    }
}

/// Channel state store plus the evaluation rules
#[derive(Debug, Default)]
pub struct PolicyEngine {
    states: HashMap<ChannelId, ChannelState>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one raw value of a channel at `now_ms`
    pub fn evaluate(
        &mut self,
        channel: ChannelId,
        raw: f64,
        now_ms: u64,
        settings: PolicySettings,
    ) -> PolicyOutcome {
        let Some(prev) = self.states.get_mut(&channel) else {
            self.states.insert(channel, ChannelState::first(raw, now_ms));
            return PolicyOutcome {
                decision: Decision::First,
                value: Some(normalize(raw, settings.normalize_360)),
                average: None,
            };
        };

        let since_publish = now_ms.saturating_sub(prev.last_publish_ms);

        let changed = raw != prev.last_value;
        if !changed && since_publish < HEARTBEAT_INTERVAL_MS {
            return PolicyOutcome::suppressed(Decision::Unchanged);
        }

        prev.history.push_back(HistoryEntry {
            value: raw,
            timestamp_ms: now_ms,
        });

        if since_publish < settings.min_interval_ms {
            return PolicyOutcome::suppressed(Decision::RateLimited);
        }

        if let Some(cutoff) = now_ms.checked_sub(settings.window_ms) {
            prev.prune(cutoff);
        }
        let average = prev
            .mean()
            .map(|mean| normalize(mean, settings.normalize_360));

        prev.last_value = raw;
        prev.last_publish_ms = now_ms;

        PolicyOutcome {
            decision: Decision::Published,
            value: Some(normalize(raw, settings.normalize_360)),
            average,
        }
    }

    /// State of a channel, if it has been observed
    pub fn state(&self, channel: ChannelId) -> Option<&ChannelState> {
        self.states.get(&channel)
    }

    /// Number of channels with state
    pub fn tracked_channels(&self) -> usize {
        self.states.len()
    }

    /// Forget all channel state
    pub fn clear(&mut self) {
        self.states.clear();
    }
}
