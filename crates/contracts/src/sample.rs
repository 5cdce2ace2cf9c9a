//! DecodedSample - Frame Decoder output
//!
//! Nine calibrated values grouped into three axis triples.

use serde::{Deserialize, Serialize};

use crate::{Axis, ChannelGroup, ChannelId};

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// Component along one axis
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// One decoded sensor report
///
/// Derived purely from a frame payload; carries no identity or timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Acceleration (g), range ±16
    pub acceleration: Vector3,

    /// Angular rate (°/s), range ±2000
    pub gyroscope: Vector3,

    /// Orientation angle (°), range ±180
    pub angle: Vector3,
}

impl DecodedSample {
    /// The triple belonging to a channel group
    pub fn group(&self, group: ChannelGroup) -> &Vector3 {
        match group {
            ChannelGroup::Acceleration => &self.acceleration,
            ChannelGroup::Gyroscope => &self.gyroscope,
            ChannelGroup::Angle => &self.angle,
        }
    }

    /// Value of a single scalar channel
    pub fn value(&self, channel: ChannelId) -> f64 {
        self.group(channel.group).axis(channel.axis)
    }

    /// All nine channels in payload order
    pub fn channels(&self) -> impl Iterator<Item = (ChannelId, f64)> + '_ {
        ChannelId::ALL.iter().map(move |&id| (id, self.value(id)))
    }
}
