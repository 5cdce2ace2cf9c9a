//! UDP Sensor Emulator
//!
//! Streams synthetic WitMotion reports to the bridge's UDP test port, so
//! `witmotion-bridge run --test-mode` can be tried without hardware. The
//! sensor slowly yaws through a full turn while rocking on the x axis.
//!
//! Run with: cargo run -p demos --bin udp_emulator -- [target] [rate_hz]

use std::time::Duration;

use contracts::DEFAULT_TEST_PORT;
use ingestion::{encode_raw, ACCEL_SCALE, ANGLE_SCALE, GYRO_SCALE, RAW_FULL_SCALE};
use tokio::net::UdpSocket;

fn to_raw(value: f64, scale: f64) -> i16 {
    (value / scale * RAW_FULL_SCALE).clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_with_config(observability::ObservabilityConfig {
        log_format: observability::LogFormat::Compact,
        metrics_port: None,
        default_log_level: "info".to_string(),
    })?;

    let mut args = std::env::args().skip(1);
    let target = args
        .next()
        .unwrap_or_else(|| format!("127.0.0.1:{DEFAULT_TEST_PORT}"));
    let rate_hz: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10.0);

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(&target).await?;
    tracing::info!(target = %target, rate_hz, "Streaming emulated frames");

    let period = Duration::from_secs_f64(1.0 / rate_hz.max(0.1));
    let mut ticker = tokio::time::interval(period);
    let mut tick: u64 = 0;

    loop {
        ticker.tick().await;
        let t = tick as f64 * period.as_secs_f64();

        let yaw = (t * 6.0) % 360.0 - 180.0;
        let roll = 20.0 * (t * 0.5).sin();
        let roll_rate = 10.0 * (t * 0.5).cos();

        let frame = encode_raw([
            to_raw(roll.to_radians().sin(), ACCEL_SCALE),
            0,
            to_raw(roll.to_radians().cos(), ACCEL_SCALE),
            to_raw(roll_rate, GYRO_SCALE),
            0,
            to_raw(6.0, GYRO_SCALE),
            to_raw(roll, ANGLE_SCALE),
            0,
            to_raw(yaw, ANGLE_SCALE),
        ]);

        if let Err(e) = socket.send(&frame.to_bytes()).await {
            tracing::warn!(error = %e, "Send failed");
        }

        tick += 1;
        if tick % 100 == 0 {
            tracing::info!(frames = tick, "Emulator progress");
        }
    }
}
