//! Chain Access
//!
//! The minimal view of a node the indexer depends on. Provider-specific
//! response types stay inside [`crate::rpc`]; everything past this seam
//! works with the plain structs below.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Doubling delay for retry `attempt` (0-based), capped at `max_ms`
pub fn exponential_backoff(initial_ms: u64, max_ms: u64, attempt: u32) -> Duration {
    let delay_ms = initial_ms.saturating_mul(1u64 << attempt.min(10));
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Errors surfaced by a chain client
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// The node executed the call and it reverted
    #[error("Call reverted: {0}")]
    Reverted(String),

    #[error("Provider error: {0}")]
    Rpc(String),

    #[error("Block {0} not available")]
    BlockNotFound(u64),

    #[error("Receipt for {0:#x} not available")]
    ReceiptNotFound(B256),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Max reconnection attempts ({0}) exceeded")]
    MaxReconnectAttemptsExceeded(u32),

    #[error("New heads subscription closed")]
    SubscriptionClosed,
}

impl ChainError {
    /// A revert is an answer, not an outage
    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted(_))
    }
}

/// Transaction as included in a block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainTransaction {
    pub hash: B256,
    pub from: Address,
    /// None for contract creation
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub max_priority_fee_per_gas: Option<u128>,
    pub input: Bytes,
}

/// Block with its full transaction bodies, in block order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainBlock {
    pub number: u64,
    pub transactions: Vec<ChainTransaction>,
}

/// Undecoded event log
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl RawLog {
    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }
}

/// Execution result of a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// Execution succeeded
    pub status: bool,
    pub from: Address,
    pub to: Option<Address>,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<RawLog>,
}

impl TxReceipt {
    /// Contract deployed by this transaction, if it was a creation
    pub fn created_contract(&self) -> Option<Address> {
        match self.to {
            None => self.contract_address,
            Some(_) => None,
        }
    }

    /// Total fee paid in wei
    pub fn gas_fee(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

/// Read access to a node
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current chain tip
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Block with full transactions, `None` if the node does not have it yet
    async fn block_with_transactions(&self, number: u64) -> Result<Option<ChainBlock>, ChainError>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError>;

    /// `eth_call` against latest state
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Stream of new head block numbers
    async fn subscribe_new_heads(&self) -> Result<mpsc::Receiver<u64>, ChainError>;
}
