//! Ingestion error types

use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Serial port could not be opened
    #[error("failed to open serial port {port}: {message}")]
    PortOpen {
        /// Port path
        port: String,
        /// Error message
        message: String,
    },

    /// Serial ports could not be enumerated
    #[error("failed to list serial ports: {message}")]
    PortEnumeration {
        /// Error message
        message: String,
    },

    /// Read failure on an open transport
    #[error("io error on {source_id}: {message}")]
    Io {
        /// Source ID
        source_id: String,
        /// Error message
        message: String,
    },

    /// No source registered under this ID
    #[error("unknown source {source_id}")]
    UnknownSource {
        /// Source ID
        source_id: String,
    },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
