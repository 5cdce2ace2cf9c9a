//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// WitMotion Bridge - publishes WitMotion IMU readings as named states
#[derive(Parser, Debug)]
#[command(
    name = "witmotion-bridge",
    author,
    version,
    about = "WitMotion IMU state bridge",
    long_about = "Reads the 20-byte WitMotion report stream from a serial port (or a UDP test \n\
                  port), decodes acceleration, angular rate and angle, and publishes \n\
                  rate-limited values and rolling averages to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "WITMOTION_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "WITMOTION_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration and published states
    Info(InfoArgs),

    /// List serial ports
    Ports(PortsArgs),

    /// Check whether a sensor answers on a port at a baud rate
    Probe(ProbeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "WITMOTION_CONFIG"
    )]
    pub config: PathBuf,

    /// Override serial port from configuration
    #[arg(long, env = "WITMOTION_SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Override baud rate from configuration
    #[arg(long, env = "WITMOTION_BAUD_RATE")]
    pub baud_rate: Option<u32>,

    /// Enable the UDP test transport regardless of configuration
    #[arg(long)]
    pub test_mode: bool,

    /// Stop after this many decoded samples (0 = unlimited)
    #[arg(long, default_value = "0", env = "WITMOTION_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "WITMOTION_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "1024", env = "WITMOTION_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "WITMOTION_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every published state with name and unit
    #[arg(long)]
    pub states: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `ports` command
#[derive(Parser, Debug)]
pub struct PortsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `probe` command
#[derive(Parser, Debug)]
pub struct ProbeArgs {
    /// Serial port to probe
    pub port: String,

    /// Baud rate to try (repeat to scan several)
    #[arg(short, long = "baud-rate", default_value = "9600")]
    pub baud_rates: Vec<u32>,

    /// How long to wait for a frame, in milliseconds
    #[arg(long, default_value = "2000")]
    pub wait_ms: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "witmotion-bridge",
            "-v",
            "run",
            "--config",
            "bridge.toml",
            "--serial-port",
            "/dev/ttyUSB1",
            "--baud-rate",
            "115200",
            "--test-mode",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("bridge.toml"));
                assert_eq!(args.serial_port.as_deref(), Some("/dev/ttyUSB1"));
                assert_eq!(args.baud_rate, Some(115200));
                assert!(args.test_mode);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_probe_multiple_bauds() {
        let cli = Cli::try_parse_from([
            "witmotion-bridge",
            "probe",
            "/dev/ttyUSB0",
            "-b",
            "9600",
            "-b",
            "115200",
        ])
        .unwrap();

        match cli.command {
            Commands::Probe(args) => {
                assert_eq!(args.port, "/dev/ttyUSB0");
                assert_eq!(args.baud_rates, vec![9600, 115200]);
                assert_eq!(args.wait_ms, 2000);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["witmotion-bridge", "-q", "-v", "ports"]);
        assert!(result.is_err());
    }
}
