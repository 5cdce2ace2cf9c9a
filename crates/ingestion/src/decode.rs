//! Frame Decoder
//!
//! Payload layout: nine little-endian 16-bit words at offsets 0, 2, .., 16,
//! in order Ax Ay Az Gx Gy Gz AngX AngY AngZ.

use contracts::{DecodedSample, Frame, Vector3, PAYLOAD_LEN};

/// Full-scale divisor of the 16-bit fields
pub const RAW_FULL_SCALE: f64 = 32768.0;

/// Acceleration range (g)
pub const ACCEL_SCALE: f64 = 16.0;

/// Angular-rate range (°/s)
pub const GYRO_SCALE: f64 = 2000.0;

/// Angle range (°)
pub const ANGLE_SCALE: f64 = 180.0;

/// Number of 16-bit fields in a payload
pub const FIELD_COUNT: usize = PAYLOAD_LEN / 2;

/// Reinterpret an unsigned 16-bit word as two's-complement signed
#[inline]
pub fn sign_int16(value: u16) -> i32 {
    let value = i32::from(value);
    if value > 32767 {
        value - 65536
    } else {
        value
    }
}

/// Raw signed fields of a payload
pub fn raw_fields(payload: &[u8; PAYLOAD_LEN]) -> [i32; FIELD_COUNT] {
    let mut fields = [0i32; FIELD_COUNT];
    for (field, word) in fields.iter_mut().zip(payload.chunks_exact(2)) {
        *field = sign_int16(u16::from_le_bytes([word[0], word[1]]));
    }
    fields
}

#[inline]
fn scaled(raw: i32, range: f64) -> f64 {
    f64::from(raw) / RAW_FULL_SCALE * range
}

fn triple(fields: &[i32], range: f64) -> Vector3 {
    Vector3 {
        x: scaled(fields[0], range),
        y: scaled(fields[1], range),
        z: scaled(fields[2], range),
    }
}

/// Decode an 18-byte payload into calibrated values
pub fn decode(payload: &[u8; PAYLOAD_LEN]) -> DecodedSample {
    let fields = raw_fields(payload);
    DecodedSample {
        acceleration: triple(&fields[0..3], ACCEL_SCALE),
        gyroscope: triple(&fields[3..6], GYRO_SCALE),
        angle: triple(&fields[6..9], ANGLE_SCALE),
    }
}

/// Decode a frame's payload
pub fn decode_frame(frame: &Frame) -> DecodedSample {
    decode(frame.payload())
}

/// Build a frame from raw signed fields (Ax..AngZ)
///
/// Used by the mock source and tests to produce device-shaped traffic.
pub fn encode_raw(fields: [i16; FIELD_COUNT]) -> Frame {
    let mut payload = [0u8; PAYLOAD_LEN];
    for (chunk, value) in payload.chunks_exact_mut(2).zip(fields) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    Frame::from_payload(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_int16_range() {
        for v in 0..=u16::MAX {
            let signed = sign_int16(v);
            assert!((-32768..=32767).contains(&signed));
            if v <= 32767 {
                assert_eq!(signed, i32::from(v));
            } else {
                assert_eq!(signed, i32::from(v) - 65536);
            }
            assert_eq!(signed, i32::from(v as i16));
        }
    }

    #[test]
    fn test_negative_acceleration_x() {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0] = 0x9A;
        payload[1] = 0xFF;

        let sample = decode(&payload);
        let expected = -102.0 / 32768.0 * 16.0;
        assert!((sample.acceleration.x - expected).abs() < 1e-12);
        assert!((sample.acceleration.x + 0.0498).abs() < 1e-4);
        assert_eq!(sample.acceleration.y, 0.0);
    }

    #[test]
    fn test_field_order_and_scales() {
        let frame = encode_raw([1, 2, 3, 4, 5, 6, 7, 2905, -9]);
        let sample = decode_frame(&frame);

        assert_eq!(sample.acceleration.z, 3.0 / 32768.0 * 16.0);
        assert_eq!(sample.gyroscope.x, 4.0 / 32768.0 * 2000.0);
        assert_eq!(sample.angle.y, 2905.0 / 32768.0 * 180.0);
        assert!((sample.angle.y - 15.958).abs() < 1e-3);
        assert_eq!(sample.angle.z, -9.0 / 32768.0 * 180.0);
    }

    #[test]
    fn test_extremes() {
        let frame = encode_raw([i16::MIN, i16::MAX, 0, i16::MIN, 0, 0, i16::MIN, 0, 0]);
        let sample = decode_frame(&frame);
        assert_eq!(sample.acceleration.x, -16.0);
        assert!(sample.acceleration.y < 16.0);
        assert_eq!(sample.gyroscope.x, -2000.0);
        assert_eq!(sample.angle.x, -180.0);
    }

    #[test]
    fn test_decode_is_pure() {
        let payload = *encode_raw([100, -100, 200, -200, 300, -300, 400, -400, 500]).payload();
        assert_eq!(decode(&payload), decode(&payload));
        assert_eq!(raw_fields(&payload)[8], 500);
    }
}
