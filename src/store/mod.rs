//! Persistence
//!
//! Document-store seams for token records, sniper rows and the sync
//! checkpoint, with Redis and in-memory backends.

use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SniperTx, SyncCheckpoint, TokenRecord};

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Errors raised by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt index entry: {0}")]
    CorruptIndex(String),

    #[error("Token {0:#x} not found")]
    TokenNotFound(Address),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Everything one transaction writes, committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerBatch {
    pub tokens: Vec<TokenRecord>,
    pub snipers: Vec<SniperTx>,
}

impl LedgerBatch {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.snipers.is_empty()
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn token_by_address(&self, address: Address) -> Result<Option<TokenRecord>, StoreError>;

    /// Record whose `pair` is `pair`
    async fn token_by_pair(&self, pair: Address) -> Result<Option<TokenRecord>, StoreError>;

    async fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError>;

    /// Operator annotation; the only write outside the classifier
    async fn set_level(&self, address: Address, level: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SniperStore: Send + Sync {
    /// Rows for one token in chain order
    async fn sniper_txs(&self, token: Address) -> Result<Vec<SniperTx>, StoreError>;

    async fn all_sniper_txs(&self) -> Result<Vec<SniperTx>, StoreError>;
}

#[async_trait]
pub trait LedgerStore: TokenStore + SniperStore {
    /// Upsert every token record and insert every sniper row of `batch` as
    /// one unit. Sniper rows already present under the same
    /// `(address, txHash)` are left untouched. A record's `level` is not
    /// written; the stored level is kept.
    async fn commit(&self, batch: &LedgerBatch) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self) -> Result<Option<SyncCheckpoint>, StoreError>;

    /// Persist `position` unless it is behind the stored checkpoint.
    ///
    /// # Returns
    /// `true` if the checkpoint moved (or was already at `position`)
    async fn advance(&self, position: SyncCheckpoint) -> Result<bool, StoreError>;
}
