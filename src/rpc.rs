//! Node Connection Module
//!
//! Connects to an Ethereum node over WebSocket or a Unix IPC socket and
//! adapts the alloy provider to [`ChainClient`]. Reconnects with exponential
//! backoff.

use alloy::consensus::TxEnvelope;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, TxKind, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider, WsConnect};
use alloy::pubsub::PubSubFrontend;
use alloy::rpc::json_rpc::RpcError;
use alloy::rpc::types::{
    BlockTransactionsKind, Transaction, TransactionInput, TransactionReceipt, TransactionRequest,
};
use alloy::transports::ipc::IpcConnect;
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::future::IntoFuture;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::chain::{exponential_backoff, ChainBlock, ChainClient, ChainError, ChainTransaction, RawLog, TxReceipt};

/// Default node endpoint
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8546";

/// Maximum number of reconnection attempts before giving up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial backoff delay for reconnection
pub const INITIAL_BACKOFF_MS: u64 = 100;

/// Maximum backoff delay for reconnection
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Per-request timeout in milliseconds
pub const REQUEST_TIMEOUT_MS: u64 = 15000;

/// Buffered new-head notifications
pub const HEADS_CHANNEL_SIZE: usize = 256;

/// Configuration for the node connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// `ws://`/`wss://` URL or path to an IPC socket
    pub endpoint: String,
    /// Maximum reconnection attempts
    pub max_reconnect_attempts: u32,
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    pub heads_channel_size: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            timeout_ms: REQUEST_TIMEOUT_MS,
            heads_channel_size: HEADS_CHANNEL_SIZE,
        }
    }
}

impl RpcConfig {
    /// Create a new config with the specified endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Calculate backoff delay for a given attempt number
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        exponential_backoff(self.initial_backoff_ms, self.max_backoff_ms, attempt)
    }
}

/// Transport selected from the endpoint string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Ws(String),
    Ipc(String),
}

impl Endpoint {
    pub fn parse(endpoint: &str) -> Result<Self, ChainError> {
        if endpoint.is_empty() {
            return Err(ChainError::ConnectionFailed("endpoint cannot be empty".to_string()));
        }
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            return Ok(Endpoint::Ws(endpoint.to_string()));
        }
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Err(ChainError::ConnectionFailed(format!(
                "{} has no pub/sub support; use ws:// or an IPC path",
                endpoint
            )));
        }
        Ok(Endpoint::Ipc(expand_path(endpoint)))
    }
}

/// Expand ~ to home directory in path
pub fn expand_path(path: &str) -> String {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Connection manager with reconnection support
pub struct RpcConnection {
    config: RpcConfig,
    reconnect_attempts: u32,
}

impl RpcConnection {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            reconnect_attempts: 0,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Reset reconnection counter
    pub fn reset_reconnect_counter(&mut self) {
        self.reconnect_attempts = 0;
    }

    /// Get current reconnection attempt count
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Calculate delay before next reconnection attempt
    pub fn next_backoff_delay(&self) -> Duration {
        self.config.backoff_delay(self.reconnect_attempts)
    }

    /// Attempt to connect once
    pub async fn connect(&mut self) -> Result<RootProvider<PubSubFrontend>, ChainError> {
        let provider = match Endpoint::parse(&self.config.endpoint)? {
            Endpoint::Ws(url) => {
                info!("Connecting to node at {}", url);
                ProviderBuilder::new()
                    .on_ws(WsConnect::new(url))
                    .await
                    .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?
            }
            Endpoint::Ipc(path) => {
                if !Path::new(&path).exists() {
                    return Err(ChainError::ConnectionFailed(format!("IPC socket not found at {}", path)));
                }
                info!("Connecting to IPC socket at {}", path);
                let ipc: IpcConnect<String> = IpcConnect::new(path);
                ProviderBuilder::new()
                    .on_ipc(ipc)
                    .await
                    .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?
            }
        };

        self.reset_reconnect_counter();
        info!("Successfully connected to node");
        Ok(provider)
    }

    /// Connect, retrying with exponential backoff
    pub async fn connect_with_retry(&mut self) -> Result<RootProvider<PubSubFrontend>, ChainError> {
        match self.connect().await {
            Ok(provider) => return Ok(provider),
            Err(e) => error!("Initial connection failed: {}", e),
        }

        while self.reconnect_attempts < self.config.max_reconnect_attempts {
            let delay = self.next_backoff_delay();
            warn!(
                "Attempting to reconnect (attempt {}/{}), waiting {:?}",
                self.reconnect_attempts + 1,
                self.config.max_reconnect_attempts,
                delay
            );

            sleep(delay).await;
            self.reconnect_attempts += 1;

            match self.connect().await {
                Ok(provider) => return Ok(provider),
                Err(e) => {
                    error!("Reconnection attempt {} failed: {}", self.reconnect_attempts, e);
                }
            }
        }

        Err(ChainError::MaxReconnectAttemptsExceeded(self.config.max_reconnect_attempts))
    }
}

fn transport_error(err: RpcError<TransportErrorKind>) -> ChainError {
    ChainError::Rpc(err.to_string())
}

/// Node-side error responses to `eth_call` are reverts
fn call_error(err: RpcError<TransportErrorKind>) -> ChainError {
    match err {
        RpcError::ErrorResp(payload) => ChainError::Reverted(payload.message.to_string()),
        RpcError::NullResp => ChainError::Reverted("empty response".to_string()),
        other => ChainError::Rpc(other.to_string()),
    }
}

/// Fields the indexer reads from a block transaction
fn convert_transaction(tx: &Transaction) -> ChainTransaction {
    let envelope: &TxEnvelope = &tx.inner;
    let (to, nonce, value, gas_limit, max_priority_fee_per_gas, input) = match envelope {
        TxEnvelope::Legacy(signed) => {
            let t = signed.tx();
            (t.to.to().copied(), t.nonce, t.value, t.gas_limit, None, t.input.clone())
        }
        TxEnvelope::Eip2930(signed) => {
            let t = signed.tx();
            (t.to.to().copied(), t.nonce, t.value, t.gas_limit, None, t.input.clone())
        }
        TxEnvelope::Eip1559(signed) => {
            let t = signed.tx();
            (
                t.to.to().copied(),
                t.nonce,
                t.value,
                t.gas_limit,
                Some(t.max_priority_fee_per_gas),
                t.input.clone(),
            )
        }
        TxEnvelope::Eip4844(signed) => {
            let t = signed.tx().tx();
            (
                Some(t.to),
                t.nonce,
                t.value,
                t.gas_limit,
                Some(t.max_priority_fee_per_gas),
                t.input.clone(),
            )
        }
        _ => (None, 0, Default::default(), 0, None, Bytes::new()),
    };

    ChainTransaction {
        hash: *envelope.tx_hash(),
        from: tx.from,
        to,
        nonce,
        value,
        gas_limit: u64::try_from(gas_limit).unwrap_or(u64::MAX),
        max_priority_fee_per_gas,
        input,
    }
}

fn convert_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| RawLog {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
        })
        .collect();

    TxReceipt {
        transaction_hash: receipt.transaction_hash,
        status: receipt.status(),
        from: receipt.from,
        to: receipt.to,
        contract_address: receipt.contract_address,
        gas_used: u64::try_from(receipt.gas_used).unwrap_or(u64::MAX),
        effective_gas_price: u128::try_from(receipt.effective_gas_price).unwrap_or(u128::MAX),
        logs,
    }
}

/// [`ChainClient`] over an alloy pub/sub provider
#[derive(Clone)]
pub struct RpcChainClient {
    provider: RootProvider<PubSubFrontend>,
    config: RpcConfig,
}

impl RpcChainClient {
    pub fn new(provider: RootProvider<PubSubFrontend>, config: RpcConfig) -> Self {
        Self { provider, config }
    }

    /// Connect using `config`, retrying with backoff
    pub async fn connect(config: RpcConfig) -> Result<Self, ChainError> {
        let mut connection = RpcConnection::new(config.clone());
        let provider = connection.connect_with_retry().await?;
        Ok(Self::new(provider, config))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64, ChainError> {
        timeout(self.request_timeout(), self.provider.get_block_number())
            .await
            .map_err(|_| ChainError::Rpc("eth_blockNumber timed out".to_string()))?
            .map_err(transport_error)
    }

    async fn block_with_transactions(&self, number: u64) -> Result<Option<ChainBlock>, ChainError> {
        let block = timeout(
            self.request_timeout(),
            self.provider
                .get_block_by_number(BlockNumberOrTag::Number(number), BlockTransactionsKind::Full),
        )
        .await
        .map_err(|_| ChainError::Rpc(format!("eth_getBlockByNumber({}) timed out", number)))?
        .map_err(transport_error)?;

        Ok(block.map(|block| ChainBlock {
            number,
            transactions: block.transactions.txns().map(convert_transaction).collect(),
        }))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        let receipt = timeout(self.request_timeout(), self.provider.get_transaction_receipt(hash))
            .await
            .map_err(|_| ChainError::Rpc(format!("eth_getTransactionReceipt({:#x}) timed out", hash)))?
            .map_err(transport_error)?;
        Ok(receipt.as_ref().map(convert_receipt))
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest {
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(data),
            ..Default::default()
        };
        timeout(self.request_timeout(), self.provider.call(&tx).into_future())
            .await
            .map_err(|_| ChainError::Rpc(format!("eth_call to {:#x} timed out", to)))?
            .map_err(call_error)
    }

    async fn subscribe_new_heads(&self) -> Result<mpsc::Receiver<u64>, ChainError> {
        let (tx, rx) = mpsc::channel(self.config.heads_channel_size);
        let provider = self.provider.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                let sub = match provider.subscribe_blocks().await {
                    Ok(sub) => {
                        attempt = 0;
                        sub
                    }
                    Err(err) => {
                        error!(?err, "new heads subscription failed");
                        if attempt >= config.max_reconnect_attempts {
                            return;
                        }
                        sleep(config.backoff_delay(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                };

                // Headers only trigger a tip query
                let mut stream = sub.into_stream();
                while stream.next().await.is_some() {
                    let number = match provider.get_block_number().await {
                        Ok(number) => number,
                        Err(err) => {
                            warn!(?err, "tip query after new head failed");
                            continue;
                        }
                    };
                    if tx.send(number).await.is_err() {
                        warn!("new heads receiver dropped");
                        return;
                    }
                }

                info!("new heads subscription ended; reconnecting");
                sleep(config.backoff_delay(attempt)).await;
                attempt += 1;
            }
        });

        Ok(rx)
    }
}
