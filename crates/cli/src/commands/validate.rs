//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, ChannelGroup, SinkType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    serial_port: Option<String>,
    baud_rate: u32,
    test_mode: bool,
    enabled_groups: Vec<String>,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let registry = blueprint.to_registry_config();
            let enabled_groups = ChannelGroup::ALL
                .into_iter()
                .filter(|g| registry.group(*g).enabled)
                .map(|g| g.to_string())
                .collect();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    serial_port: blueprint.connection.serial_port.clone(),
                    baud_rate: blueprint.connection.baud_rate,
                    test_mode: blueprint.test_mode.enabled,
                    enabled_groups,
                    sink_count: blueprint.sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - publications will be dropped".to_string());
    } else if blueprint
        .sinks
        .iter()
        .all(|s| s.sink_type == SinkType::Memory)
    {
        warnings.push("Only memory sinks configured - states are not persisted".to_string());
    }

    let registry = blueprint.to_registry_config();
    if ChannelGroup::ALL
        .into_iter()
        .all(|g| !registry.group(g).enabled)
    {
        warnings.push("All channel groups are disabled - only connection state is published".to_string());
    }

    for group in ChannelGroup::ALL {
        let config = registry.group(group);
        if config.enabled && config.window_ms > 0 && config.window_ms < config.min_interval_ms {
            warnings.push(format!(
                "{}: average window ({} ms) is shorter than the update interval ({} ms)",
                group, config.window_ms, config.min_interval_ms
            ));
        }
    }

    if blueprint.has_serial() && blueprint.test_mode.enabled {
        warnings.push("Both serial and UDP test transports are enabled".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Serial port: {}",
                summary.serial_port.as_deref().unwrap_or("(none)")
            );
            println!("  Baud rate: {}", summary.baud_rate);
            println!("  Test mode: {}", summary.test_mode);
            println!("  Enabled groups: {}", summary.enabled_groups.join(", "));
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
