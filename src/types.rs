//! Ledger Records
//!
//! Persisted shapes: per-token aggregate, captured sniper transactions and
//! the sync checkpoint. JSON field names match what downstream consumers read.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::constants::{BANANA_GUN_ROUTER, MAESTRO_ROUTER, UNISWAP_V2_ROUTER};

/// Position of a transaction in the chain: block number, then index in block.
///
/// Ordering is lexicographic, which is the replay order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxPosition {
    pub block: u64,
    pub tx: u64,
}

impl TxPosition {
    pub fn new(block: u64, tx: u64) -> Self {
        Self { block, tx }
    }
}

impl fmt::Display for TxPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.tx)
    }
}

/// Last fully processed transaction
pub type SyncCheckpoint = TxPosition;

/// Aggregate lifecycle record for one ERC-20 contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub owner: Address,
    pub total_supply: U256,
    pub token_creation_hash: B256,
    pub block_number: u64,

    pub pair: Option<Address>,
    pub pair_token: Option<Address>,

    #[serde(default)]
    pub minted_amount: U256,

    #[serde(rename = "liquidityETH")]
    pub liquidity_eth: Option<U256>,
    pub liquidity_token: Option<U256>,
    #[serde(rename = "removedLiquidityETH")]
    pub removed_liquidity_eth: Option<U256>,
    pub removed_liquidity_token: Option<U256>,
    #[serde(rename = "totalLPAmount", default)]
    pub total_lp_amount: U256,
    #[serde(rename = "currentLPAmount", default)]
    pub current_lp_amount: U256,

    #[serde(default)]
    pub buy_count: u64,
    #[serde(default)]
    pub sell_count: u64,
    #[serde(default)]
    pub first_block_buy_count: u64,
    #[serde(default)]
    pub first_block_sell_count: u64,
    /// Set by the first classified swap; marks trading as enabled
    pub first_swap_block_number: Option<u64>,
    #[serde(default)]
    pub max_trade_token_amount: U256,

    pub liquidity_locked_amount: Option<U256>,
    pub liquidity_unlock_time: Option<u64>,
    pub liquidity_locked_hash: Option<B256>,
    pub liquidity_locked_buy_count: Option<u64>,
    pub liquidity_locked_sell_count: Option<u64>,
    pub token_locked_amount: Option<U256>,
    pub token_unlock_time: Option<u64>,
    pub token_locked_hash: Option<B256>,

    pub remove_limits_hash: Option<B256>,
    pub max_wallet_size: Option<U256>,
    pub set_max_wallet_size_hash: Option<B256>,
    pub max_tx_amount: Option<U256>,
    pub set_max_tx_amount_hash: Option<B256>,
    #[serde(rename = "renounceOwnerShipHash")]
    pub renounce_ownership_hash: Option<B256>,
    pub updated_owner: Option<Address>,
    pub transfer_ownership_hash: Option<B256>,

    /// Operator annotation, written out of band and stored apart from the
    /// record; commits never change it
    pub level: Option<i64>,
    /// Last transaction whose mutations were committed to this record
    pub last_applied: Option<TxPosition>,
}

impl TokenRecord {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// True once a swap has been classified for this token
    pub fn swap_enabled(&self) -> bool {
        self.first_swap_block_number.is_some()
    }

    /// Split a pair's `(amount0, amount1)` into `(token, quote)` amounts.
    ///
    /// The pair orders its reserves by numeric address, so the side with the
    /// lower address is `amount0`.
    pub fn split_pair_amounts(&self, amount0: U256, amount1: U256) -> Option<(U256, U256)> {
        let quote = self.pair_token?;
        if self.address < quote {
            Some((amount0, amount1))
        } else {
            Some((amount1, amount0))
        }
    }
}

/// Router a sniper transaction was sent through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownCounterparty {
    BananaGun,
    UniswapV2Router,
    Maestro,
}

impl KnownCounterparty {
    pub fn address(&self) -> Address {
        match self {
            KnownCounterparty::BananaGun => BANANA_GUN_ROUTER,
            KnownCounterparty::UniswapV2Router => UNISWAP_V2_ROUTER,
            KnownCounterparty::Maestro => MAESTRO_ROUTER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KnownCounterparty::BananaGun => "BananaGun",
            KnownCounterparty::UniswapV2Router => "UniswapV2Router",
            KnownCounterparty::Maestro => "Maestro",
        }
    }
}

static KNOWN_COUNTERPARTIES: LazyLock<HashMap<Address, KnownCounterparty>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert(BANANA_GUN_ROUTER, KnownCounterparty::BananaGun);
    map.insert(UNISWAP_V2_ROUTER, KnownCounterparty::UniswapV2Router);
    map.insert(MAESTRO_ROUTER, KnownCounterparty::Maestro);
    map
});

/// Recipient of a sniper transaction: a tagged router or a raw address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Counterparty {
    Known(KnownCounterparty),
    Address(Address),
}

impl Counterparty {
    pub fn resolve(address: Address) -> Self {
        match KNOWN_COUNTERPARTIES.get(&address) {
            Some(known) => Counterparty::Known(*known),
            None => Counterparty::Address(address),
        }
    }

    pub fn is(&self, known: KnownCounterparty) -> bool {
        matches!(self, Counterparty::Known(k) if *k == known)
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, Counterparty::Known(_))
    }
}

impl fmt::Display for Counterparty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Counterparty::Known(known) => f.write_str(known.name()),
            Counterparty::Address(address) => write!(f, "{:#x}", address),
        }
    }
}

/// A buy that landed in the token's first swap block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SniperTx {
    /// Token that was bought
    pub address: Address,
    pub tx_hash: B256,
    pub from: Address,
    pub to: Counterparty,
    pub nonce: u64,
    /// Max priority fee per gas, wei
    pub priority_fee: U256,
    pub gas_limit: u64,
    pub gas_used: u64,
    /// gasUsed x effective gas price, wei
    pub gas_fee: U256,
    /// Ether sent with the transaction, wei
    pub value: U256,
    pub block_number: u64,
    pub position: u64,
}

impl SniperTx {
    /// Canonical order of rows for one token
    pub fn sort_key(&self) -> (u64, u64) {
        (self.block_number, self.position)
    }
}
