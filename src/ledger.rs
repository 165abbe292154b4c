//! Per-transaction staging of ledger writes.
//!
//! Detectors read and write token records through a [`LedgerTx`]. Writes
//! stay in memory until [`LedgerTx::commit`], which persists them as one
//! batch and only then publishes the notifications they produced.
//!
//! Every committed record carries `last_applied`, the position of the
//! transaction that last wrote it. When a transaction is replayed after a
//! crash, records already stamped at or past its position are frozen and
//! further writes to them are discarded, so replay never double counts.

use alloy::primitives::Address;
use tracing::debug;

use crate::notify::{Notification, Notifier, Topic};
use crate::store::{LedgerBatch, LedgerStore, StoreError};
use crate::types::{SniperTx, TokenRecord, TxPosition};

struct Staged {
    record: TokenRecord,
    frozen: bool,
    dirty: bool,
}

pub struct LedgerTx<'a> {
    store: &'a dyn LedgerStore,
    position: TxPosition,
    staged: Vec<Staged>,
    snipers: Vec<SniperTx>,
    events: Vec<(Topic, TokenRecord)>,
}

impl<'a> LedgerTx<'a> {
    pub fn new(store: &'a dyn LedgerStore, position: TxPosition) -> Self {
        Self {
            store,
            position,
            staged: Vec::new(),
            snipers: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn position(&self) -> TxPosition {
        self.position
    }

    fn staged_index(&self, address: &Address) -> Option<usize> {
        self.staged.iter().position(|s| s.record.address == *address)
    }

    fn stage(&mut self, record: TokenRecord) -> TokenRecord {
        let frozen = record.last_applied.is_some_and(|applied| applied >= self.position);
        if frozen {
            debug!(
                token = %format!("{:#x}", record.address),
                position = %self.position,
                "record already carries this transaction"
            );
        }
        self.staged.push(Staged {
            record: record.clone(),
            frozen,
            dirty: false,
        });
        record
    }

    pub async fn token_by_address(&mut self, address: Address) -> Result<Option<TokenRecord>, StoreError> {
        if let Some(i) = self.staged_index(&address) {
            return Ok(Some(self.staged[i].record.clone()));
        }
        let loaded = self.store.token_by_address(address).await?;
        Ok(loaded.map(|record| self.stage(record)))
    }

    pub async fn token_by_pair(&mut self, pair: Address) -> Result<Option<TokenRecord>, StoreError> {
        if let Some(staged) = self.staged.iter().find(|s| s.record.pair == Some(pair)) {
            return Ok(Some(staged.record.clone()));
        }
        let Some(loaded) = self.store.token_by_pair(pair).await? else {
            return Ok(None);
        };
        if let Some(i) = self.staged_index(&loaded.address) {
            return Ok(Some(self.staged[i].record.clone()));
        }
        Ok(Some(self.stage(loaded)))
    }

    /// Stage `record`, optionally announcing it under `topic` after commit.
    ///
    /// # Returns
    /// `false` if the record is frozen and the write was discarded
    pub fn save(&mut self, mut record: TokenRecord, topic: Option<Topic>) -> bool {
        record.last_applied = Some(self.position);
        match self.staged_index(&record.address) {
            Some(i) if self.staged[i].frozen => return false,
            Some(i) => {
                self.staged[i].record = record.clone();
                self.staged[i].dirty = true;
            }
            None => self.staged.push(Staged {
                record: record.clone(),
                frozen: false,
                dirty: true,
            }),
        }
        if let Some(topic) = topic {
            self.events.push((topic, record));
        }
        true
    }

    /// Stage a sniper row; duplicates on `(address, txHash)` are ignored
    pub fn record_sniper(&mut self, row: SniperTx) {
        let duplicate = self
            .snipers
            .iter()
            .any(|s| s.address == row.address && s.tx_hash == row.tx_hash);
        if !duplicate {
            self.snipers.push(row);
        }
    }

    pub fn batch(&self) -> LedgerBatch {
        LedgerBatch {
            tokens: self
                .staged
                .iter()
                .filter(|s| s.dirty)
                .map(|s| s.record.clone())
                .collect(),
            snipers: self.snipers.clone(),
        }
    }

    /// Persist staged writes, then hand notifications to `notifier`.
    ///
    /// # Returns
    /// Number of notifications published
    pub async fn commit(self, notifier: &dyn Notifier) -> Result<usize, StoreError> {
        let batch = self.batch();
        if !batch.is_empty() {
            self.store.commit(&batch).await?;
        }
        let count = self.events.len();
        for (topic, record) in self.events {
            notifier.publish(Notification::new(topic, record));
        }
        Ok(count)
    }
}
