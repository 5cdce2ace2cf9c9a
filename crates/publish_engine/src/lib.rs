//! # Publish Engine
//!
//! Publication policy for decoded sensor samples.
//!
//! Responsibilities:
//! - Channel Registry: group enable flags, intervals, windows, normalization
//! - Policy Engine: heartbeat suppression, rate limiting, rolling averages
//! - Turn each `DecodedSample` into the `Publication`s to write
//!
//! The engine never reads the clock; callers pass `now` in milliseconds.
//!
//! ## Usage Example
//!
//! ```ignore
//! use publish_engine::{ChannelRegistry, PublishEngine};
//!
//! let mut engine = PublishEngine::new(ChannelRegistry::new(blueprint.to_registry_config()));
//! for publication in engine.process(&sample, now_ms) {
//!     // Write to state sinks
//! }
//! ```

mod engine;
mod policy;
mod registry;

pub use engine::{EngineStats, PublishEngine};
pub use policy::{
    ChannelState, Decision, PolicyEngine, PolicyOutcome, PolicySettings, HEARTBEAT_INTERVAL_MS,
};
pub use registry::ChannelRegistry;
