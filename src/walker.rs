//! Block Walker
//!
//! Replays every transaction from the resume point through the chain tip,
//! then follows new heads. Transactions are processed one at a time in
//! (block, index) order: fetch the receipt, classify, commit, publish, and
//! only then advance the checkpoint.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::chain::{exponential_backoff, ChainBlock, ChainClient, ChainError, ChainTransaction};
use crate::constants::DEFAULT_LOOKBACK_BLOCKS;
use crate::detectors::{Classifier, TxContext};
use crate::error::{IndexerError, Result};
use crate::ledger::LedgerTx;
use crate::notify::Notifier;
use crate::store::{CheckpointStore, LedgerStore};
use crate::types::TxPosition;

/// Default attempts per transaction before the walker gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Retry schedule for transient failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: 250,
            max_backoff_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Calculate backoff delay for a given attempt number
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        exponential_backoff(self.initial_backoff_ms, self.max_backoff_ms, attempt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Blocks behind the tip to start from when there is no checkpoint
    pub lookback_blocks: u64,
    /// Explicit first block when there is no checkpoint
    pub start_block: Option<u64>,
    pub retry: RetryPolicy,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            start_block: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// First transaction the walker will process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePoint {
    pub block: u64,
    pub next_tx: u64,
}

impl ResumePoint {
    /// The transaction after `checkpoint`
    pub fn after(checkpoint: TxPosition) -> Self {
        Self {
            block: checkpoint.block,
            next_tx: checkpoint.tx + 1,
        }
    }

    pub fn block_start(block: u64) -> Self {
        Self { block, next_tx: 0 }
    }
}

/// Admits live heads once backfill has finished.
///
/// Heads at or below the last admitted block are dropped; an admitted head
/// that skips ahead yields the whole gap so no block is missed.
#[derive(Debug, Clone, Default)]
pub struct LiveGate {
    synced: bool,
    last_seen: Option<u64>,
}

impl LiveGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the gate; `through` is the last block backfill processed
    pub fn mark_synced(&mut self, through: Option<u64>) {
        self.synced = true;
        self.last_seen = through;
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Blocks to process for a new head, if any
    pub fn accept(&mut self, head: u64) -> Option<RangeInclusive<u64>> {
        if !self.synced {
            return None;
        }
        let from = match self.last_seen {
            Some(last) if head <= last => return None,
            Some(last) => last + 1,
            None => head,
        };
        self.last_seen = Some(head);
        Some(from..=head)
    }
}

pub struct BlockWalker {
    chain: Arc<dyn ChainClient>,
    classifier: Classifier,
    store: Arc<dyn LedgerStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    notifier: Arc<dyn Notifier>,
    config: WalkerConfig,
    gate: LiveGate,
}

impl BlockWalker {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        classifier: Classifier,
        store: Arc<dyn LedgerStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        notifier: Arc<dyn Notifier>,
        config: WalkerConfig,
    ) -> Self {
        Self {
            chain,
            classifier,
            store,
            checkpoints,
            notifier,
            config,
            gate: LiveGate::new(),
        }
    }

    /// Where replay starts: after the checkpoint, or at the configured
    /// start/lookback when there is none
    pub async fn resume_point(&self) -> Result<ResumePoint> {
        if let Some(checkpoint) = self.checkpoints.load().await? {
            return Ok(ResumePoint::after(checkpoint));
        }
        if let Some(start) = self.config.start_block {
            return Ok(ResumePoint::block_start(start));
        }
        let tip = self.tip(TxPosition::new(0, 0)).await?;
        Ok(ResumePoint::block_start(tip.saturating_sub(self.config.lookback_blocks)))
    }

    /// Backfill from the resume point, then follow the chain forever
    pub async fn run(&mut self) -> Result<()> {
        let resume = self.resume_point().await?;
        self.run_from(resume).await
    }

    pub async fn run_from(&mut self, resume: ResumePoint) -> Result<()> {
        let through = self.backfill(resume).await?;
        self.gate.mark_synced(through);
        info!(through = ?through, "backfill complete; following new heads");
        self.follow().await
    }

    /// Process every block from `resume` up to the current tip.
    ///
    /// # Returns
    /// The last block processed, `None` if `resume` was the very first block
    /// and the chain has not reached it
    pub async fn backfill(&mut self, resume: ResumePoint) -> Result<Option<u64>> {
        info!(block = resume.block, tx = resume.next_tx, "starting backfill");
        let mut block = resume.block;
        let mut start_tx = resume.next_tx;

        loop {
            let tip = self.tip(TxPosition::new(block, start_tx)).await?;
            if block > tip {
                break;
            }
            while block <= tip {
                self.process_block(block, start_tx).await?;
                start_tx = 0;
                block += 1;
            }
        }
        Ok(block.checked_sub(1))
    }

    /// Consume new heads until the subscription ends
    pub async fn follow(&mut self) -> Result<()> {
        let mut heads = self.chain.subscribe_new_heads().await?;
        while let Some(head) = heads.recv().await {
            let Some(range) = self.gate.accept(head) else {
                debug!(head, "stale head dropped");
                continue;
            };
            for number in range {
                self.process_block(number, 0).await?;
            }
        }
        Err(ChainError::SubscriptionClosed.into())
    }

    /// Process `number` starting at transaction index `start_tx`
    pub async fn process_block(&self, number: u64, start_tx: u64) -> Result<()> {
        let position = TxPosition::new(number, start_tx);
        let block = self.retrying(position, || self.fetch_block(number)).await?;
        debug!(block = number, txs = block.transactions.len(), "processing block");

        let start = usize::try_from(start_tx).unwrap_or(usize::MAX);
        for (index, tx) in block.transactions.iter().enumerate().skip(start) {
            let position = TxPosition::new(number, index as u64);
            self.retrying(position, || self.process_transaction(position, tx)).await?;
        }
        Ok(())
    }

    /// Classify one transaction and advance the checkpoint past it
    pub async fn process_transaction(&self, position: TxPosition, tx: &ChainTransaction) -> Result<()> {
        let receipt = self
            .chain
            .transaction_receipt(tx.hash)
            .await?
            .ok_or(ChainError::ReceiptNotFound(tx.hash))?;

        if receipt.status {
            let ctx = TxContext::new(position, tx, &receipt);
            let mut ledger = LedgerTx::new(self.store.as_ref(), position);
            self.classifier.classify(&ctx, &mut ledger).await?;
            let published = ledger.commit(self.notifier.as_ref()).await?;
            if published > 0 {
                debug!(%position, published, "committed");
            }
        } else {
            debug!(%position, tx = %format!("{:#x}", tx.hash), "reverted transaction");
        }

        if !self.checkpoints.advance(position).await? {
            warn!(%position, "checkpoint is ahead of this transaction");
        }
        Ok(())
    }

    async fn fetch_block(&self, number: u64) -> Result<ChainBlock> {
        self.chain
            .block_with_transactions(number)
            .await?
            .ok_or_else(|| ChainError::BlockNotFound(number).into())
    }

    async fn tip(&self, position: TxPosition) -> Result<u64> {
        self.retrying(position, || async {
            self.chain.block_number().await.map_err(IndexerError::from)
        })
        .await
    }

    /// Run `op` until it succeeds or the retry policy is exhausted
    async fn retrying<T, F, Fut>(&self, position: TxPosition, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = &self.config.retry;
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts {
                        error!(%position, attempts = attempt, %err, "giving up");
                        return Err(IndexerError::RetriesExhausted {
                            position,
                            attempts: attempt,
                            reason: err.to_string(),
                        });
                    }
                    let delay = policy.backoff_delay(attempt - 1);
                    warn!(%position, attempt, delay_ms = delay.as_millis() as u64, %err, "retrying");
                    sleep(delay).await;
                }
            }
        }
    }
}
