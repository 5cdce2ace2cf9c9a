//! Byte Resynchronizer
//!
//! Recovers marker-aligned 20-byte frames from an arbitrarily chunked byte
//! stream. Noise is shifted out one byte at a time until the two oldest
//! pending bytes equal the marker; a full buffer is emitted and cleared.
//!
//! A marker pair occurring inside a payload is accepted as a frame start
//! (the protocol carries no checksum).

use contracts::{Frame, FRAME_LEN, FRAME_MARKER, PAYLOAD_LEN};
use tracing::trace;

/// Stateful frame extractor, one per connection
#[derive(Debug, Clone)]
pub struct FrameResynchronizer {
    pending: [u8; FRAME_LEN],
    len: usize,
    discarded_bytes: u64,
    frames_emitted: u64,
}

impl Default for FrameResynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameResynchronizer {
    pub fn new() -> Self {
        Self {
            pending: [0; FRAME_LEN],
            len: 0,
            discarded_bytes: 0,
            frames_emitted: 0,
        }
    }

    /// Feed a chunk and collect every frame it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(bytes.len() / FRAME_LEN + 1);
        self.feed_with(bytes, |frame| frames.push(frame));
        frames
    }

    /// Feed a chunk, handing each completed frame to `on_frame` in order
    pub fn feed_with(&mut self, bytes: &[u8], mut on_frame: impl FnMut(Frame)) {
        for &byte in bytes {
            self.pending[self.len] = byte;
            self.len += 1;

            if self.len == FRAME_MARKER.len() && self.pending[..2] != FRAME_MARKER {
                self.pending[0] = self.pending[1];
                self.len = 1;
                self.discarded_bytes += 1;
                continue;
            }

            if self.len == FRAME_LEN {
                let mut payload = [0u8; PAYLOAD_LEN];
                payload.copy_from_slice(&self.pending[FRAME_MARKER.len()..]);
                self.len = 0;
                self.frames_emitted += 1;
                on_frame(Frame::from_payload(payload));
            }
        }
    }

    /// Discard any partial frame
    ///
    /// Returns the number of buffered bytes that were dropped.
    pub fn reset(&mut self) -> usize {
        let dropped = self.len;
        if dropped > 0 {
            trace!(dropped, "resync buffer reset with partial frame");
        }
        self.len = 0;
        self.discarded_bytes += dropped as u64;
        dropped
    }

    /// Bytes currently held for an incomplete frame
    pub fn pending_len(&self) -> usize {
        self.len
    }

    /// Total bytes shifted out as noise or dropped by `reset`
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded_bytes
    }

    /// Total frames emitted since creation
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(fill: u8) -> Vec<u8> {
        let mut bytes = FRAME_MARKER.to_vec();
        bytes.extend(std::iter::repeat(fill).take(PAYLOAD_LEN));
        bytes
    }

    fn stream() -> Vec<u8> {
        let mut bytes = vec![0x00, 0x55, 0x13, 0x61, 0xFF];
        bytes.extend(frame_bytes(0x11));
        bytes.extend([0x55, 0x55]);
        bytes.extend(frame_bytes(0x22));
        bytes.extend(frame_bytes(0x33));
        bytes.extend([0x55, 0x61, 0x01]);
        bytes
    }

    #[test]
    fn test_emits_aligned_frames_through_noise() {
        let mut resync = FrameResynchronizer::new();
        let frames = resync.feed(&stream());

        assert_eq!(frames.len(), 3);
        for frame in &frames {
            let bytes = frame.to_bytes();
            assert_eq!(bytes.len(), FRAME_LEN);
            assert_eq!(&bytes[..2], &FRAME_MARKER);
        }
        assert_eq!(frames[0].payload(), &[0x11; PAYLOAD_LEN]);
        assert_eq!(frames[1].payload(), &[0x22; PAYLOAD_LEN]);
        assert_eq!(frames[2].payload(), &[0x33; PAYLOAD_LEN]);
        assert_eq!(resync.pending_len(), 3);
    }

    #[test]
    fn test_split_feed_matches_single_feed() {
        let bytes = stream();
        let expected = FrameResynchronizer::new().feed(&bytes);

        for split in 0..=bytes.len() {
            let mut resync = FrameResynchronizer::new();
            let mut frames = resync.feed(&bytes[..split]);
            frames.extend(resync.feed(&bytes[split..]));
            assert_eq!(frames, expected, "split at {split}");
        }
    }

    #[test]
    fn test_byte_at_a_time_matches_single_feed() {
        let bytes = stream();
        let expected = FrameResynchronizer::new().feed(&bytes);

        let mut resync = FrameResynchronizer::new();
        let frames: Vec<Frame> = bytes.iter().flat_map(|b| resync.feed(&[*b])).collect();
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_noise_never_grows_buffer() {
        let mut resync = FrameResynchronizer::new();
        let noise: Vec<u8> = (0..1000u32).map(|i| (i % 0x55) as u8).collect();

        assert!(resync.feed(&noise).is_empty());
        assert!(resync.pending_len() <= 2);
        assert!(resync.discarded_bytes() >= 998);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut resync = FrameResynchronizer::new();
        let frame = frame_bytes(0x44);

        assert!(resync.feed(&frame[..10]).is_empty());
        assert_eq!(resync.reset(), 10);
        assert_eq!(resync.pending_len(), 0);

        // The tail alone is not a frame; the next full frame is
        assert!(resync.feed(&frame[10..]).is_empty());
        resync.reset();
        let frames = resync.feed(&frame);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload(), &[0x44; PAYLOAD_LEN]);
    }

    #[test]
    fn test_stray_marker_locks_onto_misaligned_frame() {
        // A marker pair ahead of a real frame is taken as a frame start
        let mut bytes = FRAME_MARKER.to_vec();
        bytes.extend(frame_bytes(0x11));

        let mut resync = FrameResynchronizer::new();
        let frames = resync.feed(&bytes);

        assert_eq!(frames.len(), 1);
        let payload = frames[0].payload();
        assert_eq!(&payload[..2], &FRAME_MARKER);
        assert_eq!(&payload[2..], &[0x11; PAYLOAD_LEN - 2]);
        assert_eq!(resync.pending_len(), 1);
    }
}
