//! Baud-rate probe
//!
//! Opens a port at one baud rate and waits a bounded time for at least one
//! complete frame. Uses its own resynchronizer, independent of any running
//! session.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use crate::config::DEFAULT_READ_TIMEOUT;
use crate::error::{IngestionError, Result};
use crate::resync::FrameResynchronizer;

/// Default bounded wait for a probe frame
pub const DEFAULT_PROBE_WAIT: Duration = Duration::from_millis(2000);

/// Outcome of a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub port: String,
    pub baud_rate: u32,
    /// Complete frames recovered within the wait
    pub frames: u64,
    /// Bytes read within the wait
    pub bytes_read: usize,
}

impl ProbeReport {
    /// Whether a sensor answered at this baud rate
    pub fn detected(&self) -> bool {
        self.frames > 0
    }

    pub fn summary(&self) -> &'static str {
        if self.detected() {
            "Sensor detected"
        } else {
            "Sensor not detected"
        }
    }
}

/// Probe a serial port at `baud_rate`, waiting at most `wait`
///
/// Blocking; call from a blocking context.
#[instrument(name = "probe_port", skip(wait), fields(wait_ms = wait.as_millis() as u64))]
pub fn probe_port(path: &str, baud_rate: u32, wait: Duration) -> Result<ProbeReport> {
    let mut port = serialport::new(path, baud_rate)
        .timeout(DEFAULT_READ_TIMEOUT)
        .open()
        .map_err(|e| IngestionError::PortOpen {
            port: path.to_string(),
            message: format!("at {baud_rate}: {e}"),
        })?;

    let (frames, bytes_read) = probe_reader(&mut port, wait).map_err(|e| IngestionError::Io {
        source_id: path.to_string(),
        message: e.to_string(),
    })?;

    let report = ProbeReport {
        port: path.to_string(),
        baud_rate,
        frames,
        bytes_read,
    };
    info!(
        port = %path,
        baud_rate,
        frames,
        bytes_read,
        "{}",
        report.summary()
    );
    Ok(report)
}

/// Read from `reader` until a frame is recovered, the wait elapses or the
/// reader is exhausted
///
/// Returns `(frames, bytes_read)`. Read timeouts are retried until the
/// deadline.
pub fn probe_reader<R: Read + ?Sized>(
    reader: &mut R,
    wait: Duration,
) -> std::io::Result<(u64, usize)> {
    let deadline = Instant::now() + wait;
    let mut resync = FrameResynchronizer::new();
    let mut buf = [0u8; 256];
    let mut bytes_read = 0;

    while Instant::now() < deadline {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                bytes_read += n;
                resync.feed_with(&buf[..n], |_| {});
                if resync.frames_emitted() > 0 {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok((resync.frames_emitted(), bytes_read))
}
