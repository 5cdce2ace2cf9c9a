//! Dispatcher errors

use contracts::SinkType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be built (bad params, unbindable socket)
    #[error("cannot build {sink_type:?} sink '{name}': {message}")]
    SinkCreation {
        name: String,
        sink_type: SinkType,
        message: String,
    },

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn sink_creation(
        name: impl Into<String>,
        sink_type: SinkType,
        message: impl Into<String>,
    ) -> Self {
        Self::SinkCreation {
            name: name.into(),
            sink_type,
            message: message.into(),
        }
    }
}
