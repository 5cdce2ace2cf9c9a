//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the bridge.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data flow
//! raw bytes → `Frame` → `DecodedSample` → `Publication`
//!
//! ## Time Model
//! - Wall-clock milliseconds since the Unix epoch (`u64`) are the only clock
//! - The policy engine never reads the clock itself; callers pass `now`

mod blueprint;
mod byte_source;
mod channel;
mod channel_config;
mod error;
mod frame;
mod publication;
mod sample;
mod sink;

pub use blueprint::*;
pub use byte_source::{ByteSource, SourceKind, TransportCallback, TransportEvent};
pub use channel::*;
pub use channel_config::*;
pub use error::*;
pub use frame::*;
pub use publication::*;
pub use sample::*;
pub use sink::*;
