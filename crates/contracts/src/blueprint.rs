//! BridgeBlueprint - Config Loader output
//!
//! Describes the full bridge setup: transports, channel groups, output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    AxisFlags, ChannelConfig, RegistryConfig, DEFAULT_AVERAGE_WINDOW_MS,
    DEFAULT_UPDATE_INTERVAL_MS,
};

/// Default UDP test-mode port
pub const DEFAULT_TEST_PORT: u16 = 50547;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Serial transport
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// UDP test transport
    #[serde(default)]
    pub test_mode: TestModeConfig,

    #[serde(default)]
    pub acceleration: GroupConfig,

    #[serde(default)]
    pub gyroscope: GroupConfig,

    #[serde(default)]
    pub angle: AngleGroupConfig,

    /// Output routing
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Serial connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Serial device path; no serial transport when absent
    #[serde(default)]
    pub serial_port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Reopen poll period
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_reconnect_interval_ms() -> u64 {
    3000
}

/// UDP test transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestModeConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_test_bind")]
    pub bind: String,

    #[serde(default = "default_test_port")]
    pub port: u16,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_test_bind(),
            port: default_test_port(),
        }
    }
}

impl TestModeConfig {
    /// `bind:port`
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn default_test_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_test_port() -> u16 {
    DEFAULT_TEST_PORT
}

fn default_true() -> bool {
    true
}

fn default_update_interval_ms() -> u64 {
    DEFAULT_UPDATE_INTERVAL_MS
}

fn default_average_window_ms() -> u64 {
    DEFAULT_AVERAGE_WINDOW_MS
}

/// Acceleration / gyroscope group settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum interval between instantaneous publications
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Rolling-average window
    #[serde(default = "default_average_window_ms")]
    pub average_window_ms: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            average_window_ms: DEFAULT_AVERAGE_WINDOW_MS,
        }
    }
}

impl GroupConfig {
    fn to_channel_config(self, normalize_360: AxisFlags) -> ChannelConfig {
        ChannelConfig {
            enabled: self.enabled,
            min_interval_ms: self.update_interval_ms,
            window_ms: self.average_window_ms,
            normalize_360,
        }
    }
}

/// Angle group settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AngleGroupConfig {
    #[serde(flatten)]
    pub group: GroupConfig,

    /// Map negative angles into 0..360 per axis
    #[serde(default)]
    pub normalize_360: AxisFlags,
}

/// Sink output config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific params (`path` for file, `addr` for network)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    256
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON-lines file output
    File,
    /// Network output (UDP, JSON datagrams)
    Network,
    /// In-memory state store
    Memory,
}

impl BridgeBlueprint {
    /// Build the channel registry configuration
    ///
    /// Normalization flags only ever apply to the angle group.
    pub fn to_registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            acceleration: self.acceleration.to_channel_config(AxisFlags::NONE),
            gyroscope: self.gyroscope.to_channel_config(AxisFlags::NONE),
            angle: self
                .angle
                .group
                .to_channel_config(self.angle.normalize_360),
        }
    }

    /// Whether a serial transport is configured
    pub fn has_serial(&self) -> bool {
        self.connection
            .serial_port
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }
}
