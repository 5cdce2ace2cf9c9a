//! Mock byte source
//!
//! Replays canned frames for tests and demos without hardware. Frames can
//! be prefixed with noise and cut into arbitrary chunk sizes to exercise
//! resynchronization.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{ByteSource, Frame, SourceKind, TransportCallback, TransportEvent};
use tracing::{debug, error, trace};

use super::ListenState;

/// Mock byte source configuration
#[derive(Debug, Clone)]
pub struct MockByteConfig {
    /// Source ID
    pub source_id: String,

    /// Frames replayed in order
    pub frames: Vec<Frame>,

    /// Bytes emitted before the first frame
    pub noise_prefix: Vec<u8>,

    /// Chunk size the stream is cut into (0 = one chunk per frame)
    pub chunk_size: usize,

    /// Pause after each frame
    pub interval: Duration,

    /// Replay forever instead of closing after one pass
    pub repeat: bool,
}

impl Default for MockByteConfig {
    fn default() -> Self {
        Self {
            source_id: "mock".to_string(),
            frames: Vec::new(),
            noise_prefix: Vec::new(),
            chunk_size: 0,
            interval: Duration::from_millis(10),
            repeat: false,
        }
    }
}

/// Mock byte source
pub struct MockByteSource {
    config: MockByteConfig,
    state: Arc<ListenState>,
}

impl MockByteSource {
    pub fn new(config: MockByteConfig) -> Self {
        Self {
            config,
            state: Arc::new(ListenState::default()),
        }
    }

    /// Replay `frames` once at `interval`
    pub fn frames(source_id: &str, frames: Vec<Frame>, interval: Duration) -> Self {
        Self::new(MockByteConfig {
            source_id: source_id.to_string(),
            frames,
            interval,
            ..Default::default()
        })
    }
}

impl ByteSource for MockByteSource {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Mock
    }

    fn listen(&self, callback: TransportCallback) {
        let Some(generation) = self.state.begin() else {
            return;
        };

        let config = self.config.clone();
        let state = self.state.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("mock-source-{generation}"))
            .spawn(move || {
                replay(&config, &state, generation, &callback);
                state.finish(generation);
            });

        if let Err(e) = spawned {
            error!(source = %self.config.source_id, error = %e, "failed to spawn mock source");
            self.state.finish(generation);
        }
    }

    fn stop(&self) {
        self.state.stop();
    }

    fn is_listening(&self) -> bool {
        self.state.is_listening()
    }
}

fn emit(bytes: &[u8], chunk_size: usize, callback: &TransportCallback) {
    if bytes.is_empty() {
        return;
    }
    let chunk_size = if chunk_size == 0 { bytes.len() } else { chunk_size };
    for chunk in bytes.chunks(chunk_size) {
        callback(TransportEvent::Data(Bytes::copy_from_slice(chunk)));
    }
}

fn replay(config: &MockByteConfig, state: &ListenState, generation: u64, callback: &TransportCallback) {
    debug!(
        source = %config.source_id,
        frames = config.frames.len(),
        "mock byte source started"
    );
    callback(TransportEvent::Opened);
    emit(&config.noise_prefix, config.chunk_size, callback);

    'replay: loop {
        for (index, frame) in config.frames.iter().enumerate() {
            if !state.is_current(generation) {
                break 'replay;
            }
            emit(&frame.to_bytes(), config.chunk_size, callback);
            trace!(source = %config.source_id, index, "mock frame sent");
            std::thread::sleep(config.interval);
        }
        if !config.repeat || config.frames.is_empty() {
            break;
        }
    }

    callback(TransportEvent::Closed);
    debug!(source = %config.source_id, "mock byte source stopped");
}
