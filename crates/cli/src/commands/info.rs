//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{
    all_state_definitions, BridgeBlueprint, ChannelGroup, StateDefinition, CONNECTION_STATE_ID,
};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    connection: ConnectionInfo,
    groups: Vec<GroupInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    states: Vec<StateDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct ConnectionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_port: Option<String>,
    baud_rate: u32,
    reconnect_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_mode_addr: Option<String>,
}

#[derive(Serialize)]
struct GroupInfo {
    group: String,
    unit: String,
    enabled: bool,
    update_interval_ms: u64,
    average_window_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    normalize_360: Vec<String>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) -> ConfigInfo {
    let registry = blueprint.to_registry_config();

    let groups = ChannelGroup::ALL
        .into_iter()
        .map(|group| {
            let config = registry.group(group);
            GroupInfo {
                group: group.to_string(),
                unit: group.unit().to_string(),
                enabled: config.enabled,
                update_interval_ms: config.min_interval_ms,
                average_window_ms: config.window_ms,
                normalize_360: group
                    .channels()
                    .into_iter()
                    .filter(|c| config.normalize_360.get(c.axis))
                    .map(|c| c.axis.as_str().to_string())
                    .collect(),
            }
        })
        .collect();

    let states = if args.states {
        all_state_definitions()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        connection: ConnectionInfo {
            serial_port: blueprint
                .has_serial()
                .then(|| blueprint.connection.serial_port.clone())
                .flatten(),
            baud_rate: blueprint.connection.baud_rate,
            reconnect_interval_ms: blueprint.connection.reconnect_interval_ms,
            test_mode_addr: blueprint
                .test_mode
                .enabled
                .then(|| blueprint.test_mode.socket_addr()),
        },
        groups,
        states,
        sinks,
    }
}

fn print_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               WitMotion Bridge Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Connection
    println!("🔌 Connection");
    println!("   ├─ Version: {:?}", blueprint.version);
    match blueprint.connection.serial_port.as_deref() {
        Some(port) if blueprint.has_serial() => {
            println!(
                "   ├─ Serial: {} @ {} baud",
                port, blueprint.connection.baud_rate
            );
        }
        _ => println!("   ├─ Serial: (none)"),
    }
    println!(
        "   ├─ Reconnect interval: {} ms",
        blueprint.connection.reconnect_interval_ms
    );
    if blueprint.test_mode.enabled {
        println!("   └─ UDP test mode: {}", blueprint.test_mode.socket_addr());
    } else {
        println!("   └─ UDP test mode: disabled");
    }

    // Channel groups
    let registry = blueprint.to_registry_config();
    println!("\n📈 Channel Groups");
    for (i, group) in ChannelGroup::ALL.into_iter().enumerate() {
        let is_last = i == ChannelGroup::ALL.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let config = registry.group(group);

        if config.enabled {
            println!(
                "   {} {} ({}): every {} ms, average over {} ms",
                prefix,
                group.display_name(),
                group.unit(),
                config.min_interval_ms,
                config.window_ms
            );
        } else {
            println!("   {} {}: disabled", prefix, group.display_name());
        }
    }

    // States
    if args.states {
        let definitions = all_state_definitions();
        println!("\n🏷  States ({})", definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            let is_last = i == definitions.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if def.id == CONNECTION_STATE_ID {
                println!("   {} {} - {}", prefix, def.id, def.name);
            } else {
                println!("   {} {} - {} [{}]", prefix, def.id, def.name, def.unit);
            }
        }
    }

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if args.sinks {
                println!(
                    "   {} {} ({:?}, queue {})",
                    prefix, sink.name, sink.sink_type, sink.queue_capacity
                );
            } else {
                println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
            }
        }
    }

    println!();
}
