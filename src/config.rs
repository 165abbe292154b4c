//! Indexer Configuration
//!
//! Optional TOML file layered with `TXNSCOPE__<SECTION>__<KEY>` environment
//! overrides. Every field has a default, so an empty file is valid.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{UNISWAP_V2_FACTORY, UNISWAP_V2_INIT_CODE_HASH, WETH};
use crate::heuristics::SniperThresholds;
use crate::notify::{DEFAULT_CHANNEL, NOTIFY_QUEUE_CAPACITY};
use crate::rpc::{expand_path, RpcConfig};
use crate::store::redis_store::DEFAULT_KEY_PREFIX;
use crate::walker::WalkerConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TXNSCOPE";

/// Default Redis URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    /// Pub/sub channel for notifications
    pub channel: String,
    pub key_prefix: String,
    pub queue_capacity: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            queue_capacity: NOTIFY_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// The DEX whose pairs are tracked
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DexConfig {
    pub factory: Address,
    /// Asset every tracked pair is quoted in
    pub quote_asset: Address,
    pub pair_init_code_hash: B256,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            factory: UNISWAP_V2_FACTORY,
            quote_asset: WETH,
            pair_init_code_hash: UNISWAP_V2_INIT_CODE_HASH,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub chain: RpcConfig,
    pub redis: RedisConfig,
    pub store: StoreConfig,
    pub walker: WalkerConfig,
    pub dex: DexConfig,
    pub sniper: SniperThresholds,
    pub log_level: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chain: RpcConfig::default(),
            redis: RedisConfig::default(),
            store: StoreConfig::default(),
            walker: WalkerConfig::default(),
            dex: DexConfig::default(),
            sniper: SniperThresholds::default(),
            log_level: "info".to_string(),
        }
    }
}

impl IndexerConfig {
    /// Load from `path` (if given) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(&expand_path(path)));
        }
        let cfg = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let loaded: Self = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.endpoint.is_empty() {
            return Err(ConfigError::Invalid("chain.endpoint is empty".to_string()));
        }
        if self.walker.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("walker.retry.max_attempts must be at least 1".to_string()));
        }
        if self.sniper.nonce_small_level >= self.sniper.nonce_high_level {
            return Err(ConfigError::Invalid(
                "sniper.nonce_small_level must be below sniper.nonce_high_level".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    // ==================== defaults tests ====================

    #[test]
    fn test_defaults_are_mainnet_uniswap() {
        let config = IndexerConfig::default();
        assert_eq!(config.dex.factory, UNISWAP_V2_FACTORY);
        assert_eq!(config.dex.quote_asset, WETH);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.redis.channel, "token_events");
        assert!(config.validate().is_ok());
    }

    // ==================== load tests ====================

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
log_level = "debug"

[chain]
endpoint = "/tmp/reth.ipc"

[store]
backend = "memory"

[walker]
lookback_blocks = 10
"#,
        );
        let config = IndexerConfig::load(file.path().to_str()).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.chain.endpoint, "/tmp/reth.ipc");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.walker.lookback_blocks, 10);
        assert_eq!(config.redis.key_prefix, DEFAULT_KEY_PREFIX);
        assert_eq!(config.chain.max_reconnect_attempts, crate::rpc::MAX_RECONNECT_ATTEMPTS);
    }

    #[test]
    fn test_load_dex_addresses() {
        let file = write_config(
            r#"
[dex]
factory = "0x1000000000000000000000000000000000000000"
"#,
        );
        let config = IndexerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.dex.factory, address!("1000000000000000000000000000000000000000"));
        assert_eq!(config.dex.pair_init_code_hash, UNISWAP_V2_INIT_CODE_HASH);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let file = write_config(
            r#"
[sniper]
nonce_small_level = 100
nonce_high_level = 5
"#,
        );
        assert!(matches!(
            IndexerConfig::load(file.path().to_str()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(IndexerConfig::load(Some("/nonexistent/txnscope.toml")).is_err());
    }
}
