//! Channel identifiers
//!
//! Nine scalar channels: three groups × three axes. Rendered as
//! `acceleration.x`, `gyroscope.z`, ... and `acceleration.xAvg` for averages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Channel group (one per sensor triple)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelGroup {
    Acceleration,
    Gyroscope,
    Angle,
}

impl ChannelGroup {
    /// All groups in payload order
    pub const ALL: [ChannelGroup; 3] = [
        ChannelGroup::Acceleration,
        ChannelGroup::Gyroscope,
        ChannelGroup::Angle,
    ];

    /// State-tree prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelGroup::Acceleration => "acceleration",
            ChannelGroup::Gyroscope => "gyroscope",
            ChannelGroup::Angle => "angle",
        }
    }

    /// Physical unit of the group's values
    pub fn unit(&self) -> &'static str {
        match self {
            ChannelGroup::Acceleration => "g",
            ChannelGroup::Gyroscope => "°/s",
            ChannelGroup::Angle => "°",
        }
    }

    /// Human-readable group name
    pub fn display_name(&self) -> &'static str {
        match self {
            ChannelGroup::Acceleration => "Acceleration",
            ChannelGroup::Gyroscope => "Gyroscope",
            ChannelGroup::Angle => "Angle",
        }
    }

    /// The three channels of this group
    pub fn channels(self) -> [ChannelId; 3] {
        Axis::ALL.map(|axis| ChannelId::new(self, axis))
    }
}

impl fmt::Display for ChannelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Identifier of one scalar channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId {
    pub group: ChannelGroup,
    pub axis: Axis,
}

impl ChannelId {
    /// All nine channels in payload order (Ax..Az, Gx..Gz, AngX..AngZ)
    pub const ALL: [ChannelId; 9] = [
        ChannelId::new(ChannelGroup::Acceleration, Axis::X),
        ChannelId::new(ChannelGroup::Acceleration, Axis::Y),
        ChannelId::new(ChannelGroup::Acceleration, Axis::Z),
        ChannelId::new(ChannelGroup::Gyroscope, Axis::X),
        ChannelId::new(ChannelGroup::Gyroscope, Axis::Y),
        ChannelId::new(ChannelGroup::Gyroscope, Axis::Z),
        ChannelId::new(ChannelGroup::Angle, Axis::X),
        ChannelId::new(ChannelGroup::Angle, Axis::Y),
        ChannelId::new(ChannelGroup::Angle, Axis::Z),
    ];

    pub const fn new(group: ChannelGroup, axis: Axis) -> Self {
        Self { group, axis }
    }

    /// State id of the instantaneous value, e.g. `angle.y`
    pub fn state_id(&self) -> String {
        format!("{}.{}", self.group.as_str(), self.axis.as_str())
    }

    /// State id of the rolling average, e.g. `angle.yAvg`
    pub fn average_state_id(&self) -> String {
        format!("{}.{}Avg", self.group.as_str(), self.axis.as_str())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group.as_str(), self.axis.as_str())
    }
}

/// Error returned when parsing an unknown channel id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannel(pub String);

impl fmt::Display for UnknownChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown channel '{}'", self.0)
    }
}

impl std::error::Error for UnknownChannel {}

impl FromStr for ChannelId {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelId::ALL
            .iter()
            .copied()
            .find(|id| id.state_id() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

impl Serialize for ChannelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Metadata of one published state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDefinition {
    /// State id (`acceleration.x`, `acceleration.xAvg`, ...)
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Unit
    pub unit: &'static str,
}

/// The six state definitions (value + average per axis) of a group
pub fn state_definitions(group: ChannelGroup) -> Vec<StateDefinition> {
    group
        .channels()
        .iter()
        .flat_map(|channel| {
            let axis = channel.axis.as_str().to_uppercase();
            [
                StateDefinition {
                    id: channel.state_id(),
                    name: format!("{} {}", group.display_name(), axis),
                    unit: group.unit(),
                },
                StateDefinition {
                    id: channel.average_state_id(),
                    name: format!("Average {} {}", group.as_str(), axis),
                    unit: group.unit(),
                },
            ]
        })
        .collect()
}

/// Every published state: six per group plus the connection indicator
pub fn all_state_definitions() -> Vec<StateDefinition> {
    let mut definitions: Vec<StateDefinition> = ChannelGroup::ALL
        .into_iter()
        .flat_map(state_definitions)
        .collect();
    definitions.push(StateDefinition {
        id: crate::CONNECTION_STATE_ID.to_string(),
        name: "Device or service connected".to_string(),
        unit: "",
    });
    definitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ids() {
        let id = ChannelId::new(ChannelGroup::Angle, Axis::Y);
        assert_eq!(id.state_id(), "angle.y");
        assert_eq!(id.average_state_id(), "angle.yAvg");
        assert_eq!(id.to_string(), "angle.y");
    }

    #[test]
    fn test_parse_round_trip() {
        for id in ChannelId::ALL {
            let parsed: ChannelId = id.state_id().parse().unwrap();
            assert_eq!(parsed, id);
        }
        assert!("angle.w".parse::<ChannelId>().is_err());
    }

    #[test]
    fn test_state_definitions_per_group() {
        let defs = state_definitions(ChannelGroup::Gyroscope);
        assert_eq!(defs.len(), 6);
        assert_eq!(defs[0].id, "gyroscope.x");
        assert_eq!(defs[0].name, "Gyroscope X");
        assert_eq!(defs[1].id, "gyroscope.xAvg");
        assert!(defs.iter().all(|d| d.unit == "°/s"));
    }

    #[test]
    fn test_all_state_definitions() {
        let defs = all_state_definitions();
        assert_eq!(defs.len(), 19);
        assert!(defs.iter().any(|d| d.id == "angle.zAvg" && d.unit == "°"));
        assert_eq!(defs.last().unwrap().id, "info.connection");
    }

    #[test]
    fn test_serde_as_string() {
        let id = ChannelId::new(ChannelGroup::Acceleration, Axis::Z);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acceleration.z\"");
        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
