//! Channel Registry
//!
//! Per-group configuration lookup. Disabling a group only stops its
//! channels from being evaluated; their policy state is kept.

use contracts::{ChannelConfig, ChannelGroup, ChannelId, RegistryConfig};
use tracing::info;

use crate::policy::PolicySettings;

/// Enable flags and publication settings of the three channel groups
#[derive(Debug, Clone, Default)]
pub struct ChannelRegistry {
    config: RegistryConfig,
}

impl ChannelRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn group(&self, group: ChannelGroup) -> &ChannelConfig {
        self.config.group(group)
    }

    pub fn is_enabled(&self, group: ChannelGroup) -> bool {
        self.config.group(group).enabled
    }

    pub fn set_enabled(&mut self, group: ChannelGroup, enabled: bool) {
        let config = self.config.group_mut(group);
        if config.enabled != enabled {
            info!(group = %group, enabled, "channel group toggled");
            config.enabled = enabled;
        }
    }

    /// Replace the configuration of one group
    pub fn update(&mut self, group: ChannelGroup, config: ChannelConfig) {
        *self.config.group_mut(group) = config;
    }

    /// Policy settings of one channel
    ///
    /// 360-normalization only ever applies to angle axes.
    pub fn settings(&self, channel: ChannelId) -> PolicySettings {
        let config = self.config.group(channel.group);
        PolicySettings {
            min_interval_ms: config.min_interval_ms,
            window_ms: config.window_ms,
            normalize_360: channel.group == ChannelGroup::Angle
                && config.normalize_360.get(channel.axis),
        }
    }

    /// Channels of enabled groups, in payload order
    pub fn active_channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        ChannelId::ALL
            .into_iter()
            .filter(|channel| self.is_enabled(channel.group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AxisFlags, Axis};

    #[test]
    fn test_disabled_group_is_not_active() {
        let mut registry = ChannelRegistry::default();
        assert_eq!(registry.active_channels().count(), 9);

        registry.set_enabled(ChannelGroup::Gyroscope, false);
        let active: Vec<_> = registry.active_channels().collect();
        assert_eq!(active.len(), 6);
        assert!(active.iter().all(|c| c.group != ChannelGroup::Gyroscope));
    }

    #[test]
    fn test_normalize_only_for_angle() {
        let flags = AxisFlags {
            x: true,
            y: false,
            z: true,
        };
        let mut config = RegistryConfig::default();
        config.angle.normalize_360 = flags;
        config.acceleration.normalize_360 = flags;
        config.angle.min_interval_ms = 250;
        let registry = ChannelRegistry::new(config);

        let angle_x = registry.settings(ChannelId::new(ChannelGroup::Angle, Axis::X));
        assert!(angle_x.normalize_360);
        assert_eq!(angle_x.min_interval_ms, 250);
        assert!(!registry
            .settings(ChannelId::new(ChannelGroup::Angle, Axis::Y))
            .normalize_360);
        assert!(!registry
            .settings(ChannelId::new(ChannelGroup::Acceleration, Axis::X))
            .normalize_360);
    }
}
