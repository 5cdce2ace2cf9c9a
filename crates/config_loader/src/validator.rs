//! Configuration validation
//!
//! Rules:
//! - baud_rate > 0, reconnect_interval_ms > 0
//! - test_mode.port > 0 when test mode is enabled
//! - at least one transport (serial port or test mode)
//! - sink names non-empty and unique
//! - file sinks need `path`, network sinks need `addr`

use std::collections::HashSet;

use contracts::{BridgeBlueprint, ContractError, SinkType};

/// Validate a BridgeBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    validate_connection(blueprint)?;
    validate_test_mode(blueprint)?;
    validate_transports(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_connection(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let connection = &blueprint.connection;

    if connection.baud_rate == 0 {
        return Err(ContractError::config_validation(
            "connection.baud_rate",
            "baud_rate must be > 0",
        ));
    }

    if connection.reconnect_interval_ms == 0 {
        return Err(ContractError::config_validation(
            "connection.reconnect_interval_ms",
            "reconnect_interval_ms must be > 0",
        ));
    }

    Ok(())
}

fn validate_test_mode(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let test_mode = &blueprint.test_mode;
    if test_mode.enabled && test_mode.port == 0 {
        return Err(ContractError::config_validation(
            "test_mode.port",
            "port must be > 0 when test mode is enabled",
        ));
    }
    Ok(())
}

/// At least one byte source must be configured
fn validate_transports(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    if !blueprint.has_serial() && !blueprint.test_mode.enabled {
        return Err(ContractError::config_validation(
            "connection.serial_port",
            "no transport configured: set serial_port or enable test_mode",
        ));
    }
    Ok(())
}

fn validate_sinks(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }

        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }

        let required = match sink.sink_type {
            SinkType::File => Some("path"),
            SinkType::Network => Some("addr"),
            SinkType::Log | SinkType::Memory => None,
        };
        if let Some(param) = required {
            if !sink.params.contains_key(param) {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.{param}", sink.name),
                    format!("missing required param '{param}'"),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkConfig;

    fn minimal_blueprint() -> BridgeBlueprint {
        let mut bp = BridgeBlueprint::default();
        bp.connection.serial_port = Some("/dev/ttyUSB0".into());
        bp.sinks.push(SinkConfig {
            name: "log".into(),
            sink_type: SinkType::Log,
            queue_capacity: 100,
            params: Default::default(),
        });
        bp
    }

    fn expect_error(bp: &BridgeBlueprint, needle: &str) {
        let result = validate(bp);
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains(needle), "got: {err}");
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_zero_baud_rate() {
        let mut bp = minimal_blueprint();
        bp.connection.baud_rate = 0;
        expect_error(&bp, "baud_rate must be > 0");
    }

    #[test]
    fn test_zero_reconnect_interval() {
        let mut bp = minimal_blueprint();
        bp.connection.reconnect_interval_ms = 0;
        expect_error(&bp, "reconnect_interval_ms");
    }

    #[test]
    fn test_no_transport() {
        let mut bp = minimal_blueprint();
        bp.connection.serial_port = None;
        expect_error(&bp, "no transport configured");

        bp.connection.serial_port = Some("   ".into());
        expect_error(&bp, "no transport configured");
    }

    #[test]
    fn test_test_mode_only_is_valid() {
        let mut bp = minimal_blueprint();
        bp.connection.serial_port = None;
        bp.test_mode.enabled = true;
        assert!(validate(&bp).is_ok());

        bp.test_mode.port = 0;
        expect_error(&bp, "port must be > 0");
    }

    #[test]
    fn test_zero_intervals_are_legal() {
        let mut bp = minimal_blueprint();
        bp.acceleration.update_interval_ms = 0;
        bp.acceleration.average_window_ms = 0;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_empty_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].name = String::new();
        expect_error(&bp, "cannot be empty");
    }

    #[test]
    fn test_duplicate_sink_name() {
        let mut bp = minimal_blueprint();
        bp.sinks.push(bp.sinks[0].clone());
        expect_error(&bp, "duplicate sink name");
    }

    #[test]
    fn test_sink_required_params() {
        let mut bp = minimal_blueprint();
        bp.sinks[0].sink_type = SinkType::File;
        expect_error(&bp, "missing required param 'path'");

        bp.sinks[0].sink_type = SinkType::Network;
        expect_error(&bp, "missing required param 'addr'");

        bp.sinks[0]
            .params
            .insert("addr".into(), "127.0.0.1:9000".into());
        assert!(validate(&bp).is_ok());
    }
}
