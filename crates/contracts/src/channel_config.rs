//! ChannelConfig - Channel Registry input
//!
//! Per-group publication settings, read-only to the policy engine.

use serde::{Deserialize, Serialize};

use crate::{Axis, ChannelGroup};

/// Default minimum interval between instantaneous publications (ms)
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 1000;

/// Default rolling-average window (ms)
pub const DEFAULT_AVERAGE_WINDOW_MS: u64 = 10_000;

/// Per-axis boolean flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisFlags {
    #[serde(default)]
    pub x: bool,
    #[serde(default)]
    pub y: bool,
    #[serde(default)]
    pub z: bool,
}

impl AxisFlags {
    pub const NONE: AxisFlags = AxisFlags {
        x: false,
        y: false,
        z: false,
    };

    pub fn get(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Configuration of one channel group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Whether decoded values of the group reach the policy engine
    pub enabled: bool,

    /// Minimum interval between instantaneous publications (ms), 0 = unthrottled
    pub min_interval_ms: u64,

    /// Rolling-average window length (ms)
    pub window_ms: u64,

    /// Negative → +360 mapping per axis (angle group only)
    pub normalize_360: AxisFlags,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            window_ms: DEFAULT_AVERAGE_WINDOW_MS,
            normalize_360: AxisFlags::NONE,
        }
    }
}

impl ChannelConfig {
    /// Disabled group with default timings
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Configuration of all three groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub acceleration: ChannelConfig,
    pub gyroscope: ChannelConfig,
    pub angle: ChannelConfig,
}

impl RegistryConfig {
    pub fn group(&self, group: ChannelGroup) -> &ChannelConfig {
        match group {
            ChannelGroup::Acceleration => &self.acceleration,
            ChannelGroup::Gyroscope => &self.gyroscope,
            ChannelGroup::Angle => &self.angle,
        }
    }

    pub fn group_mut(&mut self, group: ChannelGroup) -> &mut ChannelConfig {
        match group {
            ChannelGroup::Acceleration => &mut self.acceleration,
            ChannelGroup::Gyroscope => &mut self.gyroscope,
            ChannelGroup::Angle => &mut self.angle,
        }
    }
}
