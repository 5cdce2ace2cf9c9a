//! `ports` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::PortsArgs;

#[derive(Serialize)]
struct PortEntry {
    path: String,
    description: String,
}

/// Execute the `ports` command
pub fn run_ports(args: &PortsArgs) -> Result<()> {
    let ports: Vec<PortEntry> = ingestion::list_ports()
        .context("Failed to list serial ports")?
        .into_iter()
        .map(|p| PortEntry {
            path: p.path,
            description: p.description,
        })
        .collect();

    info!(count = ports.len(), "Serial ports listed");

    if args.json {
        let json = serde_json::to_string_pretty(&ports).context("Failed to serialize ports")?;
        println!("{}", json);
        return Ok(());
    }

    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    println!("Serial ports ({}):", ports.len());
    for port in &ports {
        println!("  {:<24} {}", port.path, port.description);
    }

    Ok(())
}
