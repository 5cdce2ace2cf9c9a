//! `probe` command implementation.

use anyhow::{Context, Result};
use ingestion::ProbeReport;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::ProbeArgs;

#[derive(Serialize)]
struct ProbeResult {
    port: String,
    baud_rate: u32,
    detected: bool,
    frames: u64,
    bytes_read: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ProbeReport> for ProbeResult {
    fn from(report: ProbeReport) -> Self {
        Self {
            detected: report.detected(),
            port: report.port,
            baud_rate: report.baud_rate,
            frames: report.frames,
            bytes_read: report.bytes_read,
            error: None,
        }
    }
}

/// Execute the `probe` command
///
/// Tries each requested baud rate in order and stops at the first one that
/// yields a complete frame.
pub async fn run_probe(args: &ProbeArgs) -> Result<()> {
    let wait = Duration::from_millis(args.wait_ms);
    let mut results = Vec::with_capacity(args.baud_rates.len());

    for &baud_rate in &args.baud_rates {
        info!(port = %args.port, baud_rate, "Testing serial port");

        let port = args.port.clone();
        let outcome = tokio::task::spawn_blocking(move || ingestion::probe_port(&port, baud_rate, wait))
            .await
            .context("Probe task panicked")?;

        let result = match outcome {
            Ok(report) => ProbeResult::from(report),
            Err(e) => {
                warn!(port = %args.port, baud_rate, error = %e, "Probe failed");
                ProbeResult {
                    port: args.port.clone(),
                    baud_rate,
                    detected: false,
                    frames: 0,
                    bytes_read: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let detected = result.detected;
        results.push(result);
        if detected {
            info!(port = %args.port, baud_rate, "Detected baud rate");
            break;
        }
    }

    if args.json {
        let json =
            serde_json::to_string_pretty(&results).context("Failed to serialize probe results")?;
        println!("{}", json);
    } else {
        for result in &results {
            match (&result.error, result.detected) {
                (Some(error), _) => {
                    println!("✗ {} @ {}: {}", result.port, result.baud_rate, error)
                }
                (None, true) => println!(
                    "✓ {} @ {}: Sensor detected ({} frames, {} bytes)",
                    result.port, result.baud_rate, result.frames, result.bytes_read
                ),
                (None, false) => println!(
                    "✗ {} @ {}: Sensor not detected ({} bytes read)",
                    result.port, result.baud_rate, result.bytes_read
                ),
            }
        }
    }

    Ok(())
}
