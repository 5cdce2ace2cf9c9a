//! Command implementations.

mod info;
mod ports;
mod probe;
mod run;
mod validate;

pub use info::run_info;
pub use ports::run_ports;
pub use probe::run_probe;
pub use run::run_bridge;
pub use validate::run_validate;

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
use std::path::Path;

use crate::error::CliError;

/// Load a configuration file, failing early when it does not exist
pub(crate) fn load_blueprint(path: &Path) -> Result<BridgeBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
