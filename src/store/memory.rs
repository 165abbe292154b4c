//! In-process store used for dry runs and tests.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::{CheckpointStore, LedgerBatch, LedgerStore, SniperStore, StoreError, TokenStore};
use crate::types::{SniperTx, SyncCheckpoint, TokenRecord};

#[derive(Default)]
struct Inner {
    tokens: HashMap<Address, TokenRecord>,
    pairs: HashMap<Address, Address>,
    snipers: Vec<SniperTx>,
    sniper_keys: HashSet<(Address, B256)>,
    /// Operator levels, kept apart from the classifier-owned records
    levels: HashMap<Address, i64>,
    checkpoint: Option<SyncCheckpoint>,
}

impl Inner {
    fn upsert_token(&mut self, mut record: TokenRecord) {
        record.level = None;
        if let Some(pair) = record.pair {
            self.pairs.insert(pair, record.address);
        }
        self.tokens.insert(record.address, record);
    }

    fn read_token(&self, address: &Address) -> Option<TokenRecord> {
        let mut record = self.tokens.get(address)?.clone();
        record.level = self.levels.get(address).copied();
        Some(record)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a record directly
    pub fn insert_token(&self, record: TokenRecord) {
        let mut inner = self.lock();
        if let Some(level) = record.level {
            inner.levels.insert(record.address, level);
        }
        inner.upsert_token(record);
    }

    pub fn token_count(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn sniper_count(&self) -> usize {
        self.lock().snipers.len()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn token_by_address(&self, address: Address) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.lock().read_token(&address))
    }

    async fn token_by_pair(&self, pair: Address) -> Result<Option<TokenRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .pairs
            .get(&pair)
            .and_then(|address| inner.read_token(address)))
    }

    async fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let inner = self.lock();
        let mut tokens: Vec<TokenRecord> = inner.tokens.keys().filter_map(|a| inner.read_token(a)).collect();
        tokens.sort_by_key(|t| (t.block_number, t.address));
        Ok(tokens)
    }

    async fn set_level(&self, address: Address, level: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.tokens.contains_key(&address) {
            return Err(StoreError::TokenNotFound(address));
        }
        inner.levels.insert(address, level);
        Ok(())
    }
}

#[async_trait]
impl SniperStore for MemoryStore {
    async fn sniper_txs(&self, token: Address) -> Result<Vec<SniperTx>, StoreError> {
        let mut rows: Vec<SniperTx> = self
            .lock()
            .snipers
            .iter()
            .filter(|row| row.address == token)
            .cloned()
            .collect();
        rows.sort_by_key(SniperTx::sort_key);
        Ok(rows)
    }

    async fn all_sniper_txs(&self) -> Result<Vec<SniperTx>, StoreError> {
        let mut rows = self.lock().snipers.clone();
        rows.sort_by_key(SniperTx::sort_key);
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn commit(&self, batch: &LedgerBatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for record in &batch.tokens {
            inner.upsert_token(record.clone());
        }
        for row in &batch.snipers {
            if inner.sniper_keys.insert((row.address, row.tx_hash)) {
                inner.snipers.push(row.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self) -> Result<Option<SyncCheckpoint>, StoreError> {
        Ok(self.lock().checkpoint)
    }

    async fn advance(&self, position: SyncCheckpoint) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner.checkpoint {
            Some(current) if position < current => Ok(false),
            _ => {
                inner.checkpoint = Some(position);
                Ok(true)
            }
        }
    }
}
