//! Frame - Resynchronizer output
//!
//! Wire layout of one sensor report:
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ Marker (2B)  │ Payload (18B)                                │
//! │ 0x55 0x61    │ 9 × i16 LE: Ax Ay Az Gx Gy Gz AngX AngY AngZ │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//! No checksum, no frame counter, no variable length.

use std::fmt;

/// Synchronization marker that starts every frame.
pub const FRAME_MARKER: [u8; 2] = [0x55, 0x61];

/// Total frame size in bytes (marker + payload).
pub const FRAME_LEN: usize = 20;

/// Payload size in bytes.
pub const PAYLOAD_LEN: usize = FRAME_LEN - FRAME_MARKER.len();

/// A complete, marker-aligned sensor frame.
///
/// The marker is implied; only the payload is stored.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    payload: [u8; PAYLOAD_LEN],
}

impl Frame {
    /// Wrap a 20-byte buffer, returning `None` if the marker is missing.
    pub fn from_bytes(bytes: &[u8; FRAME_LEN]) -> Option<Self> {
        let (marker, rest) = bytes.split_at(FRAME_MARKER.len());
        if marker != FRAME_MARKER {
            return None;
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(rest);
        Some(Self { payload })
    }

    /// Build a frame around an 18-byte payload.
    pub fn from_payload(payload: [u8; PAYLOAD_LEN]) -> Self {
        Self { payload }
    }

    /// Full wire bytes, marker included.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[..FRAME_MARKER.len()].copy_from_slice(&FRAME_MARKER);
        bytes[FRAME_MARKER.len()..].copy_from_slice(&self.payload);
        bytes
    }

    /// The 18 payload bytes following the marker.
    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame(")?;
        for (i, b) in self.to_bytes().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02X}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_requires_marker() {
        let mut bytes = [0u8; FRAME_LEN];
        assert!(Frame::from_bytes(&bytes).is_none());

        bytes[0] = 0x55;
        bytes[1] = 0x61;
        let frame = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(frame.payload(), &[0u8; PAYLOAD_LEN]);
    }

    #[test]
    fn test_from_payload_prefixes_marker() {
        let payload = [7u8; PAYLOAD_LEN];
        let frame = Frame::from_payload(payload);
        assert_eq!(&frame.to_bytes()[..2], &FRAME_MARKER);
        assert_eq!(frame.payload(), &payload);
    }

    #[test]
    fn test_debug_is_hex() {
        let frame = Frame::from_payload([0xAB; PAYLOAD_LEN]);
        let s = format!("{frame:?}");
        assert!(s.starts_with("Frame(55 61 AB"));
    }
}
