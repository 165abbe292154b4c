use thiserror::Error;

use crate::chain::ChainError;
use crate::detectors::ClassifyError;
use crate::store::StoreError;
use crate::types::TxPosition;

/// Top-level error for the indexer
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classification failed: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Gave up on {position} after {attempts} attempts: {reason}")]
    RetriesExhausted {
        position: TxPosition,
        attempts: u32,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, IndexerError>;
