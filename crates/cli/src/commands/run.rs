//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::BridgeBlueprint;

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(ref port) = args.serial_port {
        info!(port = %port, "Overriding serial port from CLI");
        blueprint.connection.serial_port = Some(port.clone());
    }
    if let Some(baud_rate) = args.baud_rate {
        info!(baud_rate, "Overriding baud rate from CLI");
        blueprint.connection.baud_rate = baud_rate;
    }
    if args.test_mode && !blueprint.test_mode.enabled {
        info!(port = blueprint.test_mode.port, "Enabling UDP test mode from CLI");
        blueprint.test_mode.enabled = true;
    }

    info!(
        serial_port = ?blueprint.connection.serial_port,
        baud_rate = blueprint.connection.baud_rate,
        test_mode = blueprint.test_mode.enabled,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_samples: (args.max_samples > 0).then_some(args.max_samples),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting bridge...");

    let stats = pipeline
        .run(setup_shutdown_signal())
        .await
        .context("Bridge execution failed")?;

    info!(
        samples = stats.samples_decoded,
        batches = stats.batches_dispatched,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.sample_rate()),
        "Bridge stopped"
    );
    if stats.sink_drops() > 0 {
        warn!(dropped = stats.sink_drops(), "Some sinks could not keep up; batches were dropped");
    }

    stats.print_summary();

    info!("WitMotion bridge finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, stopping bridge...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Connection:");
    match blueprint.connection.serial_port.as_deref() {
        Some(port) if blueprint.has_serial() => {
            println!("  Serial: {} @ {}", port, blueprint.connection.baud_rate);
            println!(
                "  Reconnect interval: {} ms",
                blueprint.connection.reconnect_interval_ms
            );
        }
        _ => println!("  Serial: (none)"),
    }
    if blueprint.test_mode.enabled {
        println!("  UDP test mode: {}", blueprint.test_mode.socket_addr());
    }

    let registry = blueprint.to_registry_config();
    println!("\nChannel groups:");
    for group in contracts::ChannelGroup::ALL {
        let config = registry.group(group);
        if config.enabled {
            println!(
                "  - {}: every {} ms, average over {} ms",
                group, config.min_interval_ms, config.window_ms
            );
        } else {
            println!("  - {}: disabled", group);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!();
}
