//! TxnScope Indexer Library
//!
//! This crate walks chain history and the live tip, classifies token
//! lifecycle events (creation, pairing, liquidity, swaps, locks, limit and
//! ownership changes), keeps one aggregate record per token plus the
//! first-block sniper transactions, and publishes changes to Redis.

pub mod abi;
pub mod chain;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod detectors;
pub mod error;
pub mod heuristics;
pub mod ledger;
pub mod notify;
pub mod pair;
pub mod rpc;
pub mod selectors;
pub mod store;
pub mod types;
pub mod walker;

// Re-export commonly used types
pub use chain::{ChainBlock, ChainClient, ChainError, ChainTransaction, RawLog, TxReceipt};
pub use config::IndexerConfig;
pub use decoder::{decode_logs, DecodedEvent, DecodedLog};
pub use detectors::Classifier;
pub use error::{IndexerError, Result};
pub use heuristics::{ScreenKind, SniperAnalytics, SniperThresholds};
pub use notify::{Notification, Notifier, Topic};
pub use store::{CheckpointStore, LedgerStore, MemoryStore, RedisStore};
pub use types::{SniperTx, TokenRecord, TxPosition};
pub use walker::{BlockWalker, WalkerConfig};
