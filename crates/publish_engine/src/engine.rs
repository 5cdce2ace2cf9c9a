//! PublishEngine: registry + policy over whole decoded samples

use contracts::{DecodedSample, Publication};
use tracing::{instrument, trace};

use crate::policy::{Decision, PolicyEngine};
use crate::registry::ChannelRegistry;

/// Running totals of the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub samples: u64,
    pub evaluations: u64,
    pub values_published: u64,
    pub averages_published: u64,
    pub suppressed_unchanged: u64,
    pub suppressed_rate_limited: u64,
}

/// Decides, per decoded sample, which states to publish
///
/// Holds channel state for every source feeding it; callers evaluating
/// from several tasks must serialize access.
#[derive(Debug, Default)]
pub struct PublishEngine {
    registry: ChannelRegistry,
    policy: PolicyEngine,
    stats: EngineStats,
}

impl PublishEngine {
    pub fn new(registry: ChannelRegistry) -> Self {
        Self {
            registry,
            policy: PolicyEngine::new(),
            stats: EngineStats::default(),
        }
    }

    /// Evaluate every enabled channel of `sample` at `now_ms`
    ///
    /// Per channel the average (if any) precedes the value.
    #[instrument(name = "publish_engine_process", level = "trace", skip(self, sample))]
    pub fn process(&mut self, sample: &DecodedSample, now_ms: u64) -> Vec<Publication> {
        self.stats.samples += 1;
        let mut publications = Vec::new();

        for channel in self.registry.active_channels() {
            let settings = self.registry.settings(channel);
            let outcome = self
                .policy
                .evaluate(channel, sample.value(channel), now_ms, settings);
            self.stats.evaluations += 1;

            match outcome.decision {
                Decision::Unchanged => {
                    self.stats.suppressed_unchanged += 1;
                    metrics::counter!("witmotion_evaluations_suppressed_total", "reason" => "unchanged")
                        .increment(1);
                }
                Decision::RateLimited => {
                    self.stats.suppressed_rate_limited += 1;
                    metrics::counter!("witmotion_evaluations_suppressed_total", "reason" => "rate_limited")
                        .increment(1);
                }
                Decision::First | Decision::Published => {}
            }

            if let Some(average) = outcome.average {
                self.stats.averages_published += 1;
                publications.push(Publication::average(channel, average, now_ms));
            }
            if let Some(value) = outcome.value {
                self.stats.values_published += 1;
                publications.push(Publication::value(channel, value, now_ms));
            }
        }

        if !publications.is_empty() {
            let averages = publications.iter().filter(|p| p.is_average).count();
            metrics::counter!("witmotion_publications_total", "kind" => "value")
                .increment((publications.len() - averages) as u64);
            metrics::counter!("witmotion_publications_total", "kind" => "average")
                .increment(averages as u64);
        }
        trace!(now_ms, published = publications.len(), "sample evaluated");
        publications
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ChannelRegistry {
        &mut self.registry
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Axis, ChannelGroup, ChannelId, RegistryConfig, Vector3};

    fn sample(angle_y: f64) -> DecodedSample {
        DecodedSample {
            acceleration: Vector3 {
                x: 0.1,
                y: 0.2,
                z: 1.0,
            },
            gyroscope: Vector3::default(),
            angle: Vector3 {
                x: 0.0,
                y: angle_y,
                z: -90.0,
            },
        }
    }

    fn find<'a>(pubs: &'a [Publication], id: &str) -> Option<&'a Publication> {
        pubs.iter().find(|p| p.state_id == id)
    }

    #[test]
    fn test_first_sample_publishes_every_value_without_averages() {
        let mut engine = PublishEngine::default();
        let pubs = engine.process(&sample(15.95), 1_000);

        assert_eq!(pubs.len(), 9);
        assert!(pubs.iter().all(|p| !p.is_average));
        assert_eq!(find(&pubs, "angle.y").unwrap().value, 15.95);
        assert!(find(&pubs, "angle.yAvg").is_none());
    }

    #[test]
    fn test_only_changed_channels_publish_after_interval() {
        let mut engine = PublishEngine::default();
        engine.process(&sample(10.0), 0);

        // Within the 1000 ms interval everything is suppressed
        assert!(engine.process(&sample(11.0), 500).is_empty());

        let pubs = engine.process(&sample(12.0), 1_000);
        let ids: Vec<&str> = pubs.iter().map(|p| p.state_id.as_str()).collect();
        assert_eq!(ids, vec!["angle.yAvg", "angle.y"]);
        assert_eq!(pubs[0].value, 11.5);
        assert_eq!(pubs[1].value, 12.0);

        let stats = engine.stats();
        assert_eq!(stats.samples, 3);
        assert_eq!(stats.suppressed_rate_limited, 1);
        assert_eq!(stats.suppressed_unchanged, 16);
    }

    #[test]
    fn test_disabled_group_keeps_state() {
        let mut engine = PublishEngine::default();
        engine.process(&sample(10.0), 0);

        engine
            .registry_mut()
            .set_enabled(ChannelGroup::Angle, false);
        let pubs = engine.process(&sample(20.0), 5_000);
        assert!(pubs.iter().all(|p| !p.state_id.starts_with("angle")));

        engine.registry_mut().set_enabled(ChannelGroup::Angle, true);
        let state = engine
            .policy()
            .state(ChannelId::new(ChannelGroup::Angle, Axis::Y))
            .unwrap();
        assert_eq!(state.last_value(), 10.0);
    }

    #[test]
    fn test_angle_normalization_from_registry() {
        let mut config = RegistryConfig::default();
        config.angle.normalize_360.z = true;
        let mut engine = PublishEngine::new(ChannelRegistry::new(config));

        let pubs = engine.process(&sample(0.0), 0);
        assert_eq!(find(&pubs, "angle.z").unwrap().value, 270.0);
        assert_eq!(find(&pubs, "angle.x").unwrap().value, 0.0);
    }
}
