//! Byte source implementations

mod mock;
mod serial;
mod udp;

pub use mock::{MockByteConfig, MockByteSource};
pub use serial::{list_ports, PortInfo, SerialSource};
pub use udp::UdpSource;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Listening flag plus a generation counter
///
/// Each `listen` starts a new generation; a worker only keeps running while
/// its generation is current, so a quick stop/listen never leaves two
/// readers on one transport.
#[derive(Debug, Default)]
pub(crate) struct ListenState {
    listening: AtomicBool,
    generation: AtomicU64,
}

impl ListenState {
    /// Start a new generation, or `None` if already listening
    pub(crate) fn begin(&self) -> Option<u64> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether the worker of `generation` should keep running
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.listening.load(Ordering::Relaxed)
            && self.generation.load(Ordering::Relaxed) == generation
    }

    /// Called by a worker on exit
    pub(crate) fn finish(&self, generation: u64) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.listening.store(false, Ordering::SeqCst);
        }
    }

    /// Returns whether a worker was running
    pub(crate) fn stop(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.listening.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
