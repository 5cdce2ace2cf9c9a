//! StateSink trait - Dispatcher output interface
//!
//! Abstract state store receiving publications.

use crate::{ContractError, PublicationBatch};

/// State output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(StateSink: Send)]
pub trait LocalStateSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one batch of publications
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, batch: &PublicationBatch) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
