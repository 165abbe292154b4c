//! Redis Store
//!
//! Records are JSON documents under a key prefix:
//! `{p}:token:{address}`, `{p}:pair:{pair}` -> token address, `{p}:tokens`,
//! `{p}:snipers:{token}` (hash, txHash -> row), `{p}:sniper_tokens`,
//! `{p}:level:{address}` and `{p}:checkpoint`.
//!
//! The operator level lives in its own key and is merged into the record on
//! read; commits never write it.

use alloy::primitives::Address;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::str::FromStr;
use tracing::debug;

use super::{CheckpointStore, LedgerBatch, LedgerStore, SniperStore, StoreError, TokenStore};
use crate::types::{SniperTx, SyncCheckpoint, TokenRecord};

/// Default key prefix
pub const DEFAULT_KEY_PREFIX: &str = "txnscope";

/// Key layout under one prefix
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn token(&self, address: &Address) -> String {
        format!("{}:token:{:#x}", self.prefix, address)
    }

    pub fn pair(&self, pair: &Address) -> String {
        format!("{}:pair:{:#x}", self.prefix, pair)
    }

    pub fn tokens(&self) -> String {
        format!("{}:tokens", self.prefix)
    }

    pub fn snipers(&self, token: &Address) -> String {
        format!("{}:snipers:{:#x}", self.prefix, token)
    }

    pub fn sniper_tokens(&self) -> String {
        format!("{}:sniper_tokens", self.prefix)
    }

    pub fn level(&self, address: &Address) -> String {
        format!("{}:level:{:#x}", self.prefix, address)
    }

    pub fn checkpoint(&self) -> String {
        format!("{}:checkpoint", self.prefix)
    }
}

/// Record JSON as committed, without the operator level
fn token_document(record: &TokenRecord) -> Result<String, serde_json::Error> {
    let mut document = record.clone();
    document.level = None;
    serde_json::to_string(&document)
}

fn parse_address(raw: &str) -> Result<Address, StoreError> {
    Address::from_str(raw).map_err(|_| StoreError::CorruptIndex(raw.to_string()))
}

/// Redis-backed implementation of every store trait
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    keys: KeySpace,
}

impl RedisStore {
    /// # Arguments
    /// * `connection` - An established Redis multiplexed connection
    /// * `prefix` - Namespace for every key this store writes
    pub fn new(connection: MultiplexedConnection, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            keys: KeySpace::new(prefix),
        }
    }

    /// Open a connection to `url`
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Self::new(connection, prefix))
    }

    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }
}

#[async_trait]
impl TokenStore for RedisStore {
    async fn token_by_address(&self, address: Address) -> Result<Option<TokenRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let (json, level): (Option<String>, Option<i64>) = redis::pipe()
            .get(self.keys.token(&address))
            .get(self.keys.level(&address))
            .query_async(&mut conn)
            .await?;
        let Some(json) = json else {
            return Ok(None);
        };
        let mut record: TokenRecord = serde_json::from_str(&json)?;
        record.level = level;
        Ok(Some(record))
    }

    async fn token_by_pair(&self, pair: Address) -> Result<Option<TokenRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let address: Option<String> = conn.get(self.keys.pair(&pair)).await?;
        match address {
            Some(raw) => self.token_by_address(parse_address(&raw)?).await,
            None => Ok(None),
        }
    }

    async fn tokens(&self) -> Result<Vec<TokenRecord>, StoreError> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.smembers(self.keys.tokens()).await?;
        let mut tokens = Vec::with_capacity(members.len());
        for raw in members {
            if let Some(record) = self.token_by_address(parse_address(&raw)?).await? {
                tokens.push(record);
            }
        }
        tokens.sort_by_key(|t| (t.block_number, t.address));
        Ok(tokens)
    }

    async fn set_level(&self, address: Address, level: i64) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(self.keys.token(&address)).await?;
        if !exists {
            return Err(StoreError::TokenNotFound(address));
        }
        let _: () = conn.set(self.keys.level(&address), level).await?;
        Ok(())
    }
}

#[async_trait]
impl SniperStore for RedisStore {
    async fn sniper_txs(&self, token: Address) -> Result<Vec<SniperTx>, StoreError> {
        let mut conn = self.connection.clone();
        let values: Vec<String> = conn.hvals(self.keys.snipers(&token)).await?;
        let mut rows = values
            .iter()
            .map(|v| serde_json::from_str::<SniperTx>(v))
            .collect::<Result<Vec<_>, _>>()?;
        rows.sort_by_key(SniperTx::sort_key);
        Ok(rows)
    }

    async fn all_sniper_txs(&self) -> Result<Vec<SniperTx>, StoreError> {
        let mut conn = self.connection.clone();
        let members: Vec<String> = conn.smembers(self.keys.sniper_tokens()).await?;
        let mut rows = Vec::new();
        for raw in members {
            rows.extend(self.sniper_txs(parse_address(&raw)?).await?);
        }
        rows.sort_by_key(SniperTx::sort_key);
        Ok(rows)
    }
}

#[async_trait]
impl LedgerStore for RedisStore {
    async fn commit(&self, batch: &LedgerBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for record in &batch.tokens {
            let address = format!("{:#x}", record.address);
            pipe.set(self.keys.token(&record.address), token_document(record)?)
                .ignore();
            pipe.sadd(self.keys.tokens(), &address).ignore();
            if let Some(pair) = record.pair {
                pipe.set(self.keys.pair(&pair), &address).ignore();
            }
        }
        for row in &batch.snipers {
            pipe.hset_nx(
                self.keys.snipers(&row.address),
                format!("{:#x}", row.tx_hash),
                serde_json::to_string(row)?,
            )
            .ignore();
            pipe.sadd(self.keys.sniper_tokens(), format!("{:#x}", row.address))
                .ignore();
        }

        let mut conn = self.connection.clone();
        let _: () = pipe.query_async(&mut conn).await?;
        debug!(
            tokens = batch.tokens.len(),
            snipers = batch.snipers.len(),
            "committed ledger batch"
        );
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for RedisStore {
    async fn load(&self) -> Result<Option<SyncCheckpoint>, StoreError> {
        let mut conn = self.connection.clone();
        let json: Option<String> = conn.get(self.keys.checkpoint()).await?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from)).transpose()
    }

    async fn advance(&self, position: SyncCheckpoint) -> Result<bool, StoreError> {
        // Single writer: read-compare-write is sufficient
        if let Some(current) = self.load().await? {
            if position < current {
                return Ok(false);
            }
        }
        let mut conn = self.connection.clone();
        let _: () = conn
            .set(self.keys.checkpoint(), serde_json::to_string(&position)?)
            .await?;
        Ok(true)
    }
}
