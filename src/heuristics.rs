//! Sniper Heuristics
//!
//! Post-hoc analytics over captured first-block buys: how many distinct
//! actors sniped a token, how many used fresh wallets, and which launches
//! look dominated by a single bot.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::store::{LedgerStore, StoreError};
use crate::types::{Counterparty, KnownCounterparty, SniperTx, TokenRecord};

/// BananaGun cluster size that always counts as special
pub const BANANA_GUN_SPECIAL_CAP: usize = 14;

/// Nonces at or above this are never "bot-like" in [`is_nonce_same`]
pub const SAME_NONCE_CEILING: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniperThresholds {
    /// Nonce at or below this marks a fresh wallet
    pub nonce_small_level: u64,
    /// Nonce at or above this marks a seasoned wallet
    pub nonce_high_level: u64,
    /// Two buys through the same counterparty within this many wei are one actor
    pub same_delta_wei: u64,
    pub filter_nonce_count: usize,
    pub filter_snipers_count: usize,
    pub wallet_number_min: usize,
    pub double_sniper_wallet: usize,
    pub banana_gun_min_count: usize,
    pub banana_gun_rate: f64,
    pub maestro_rate: f64,
    pub mev_rate: f64,
}

impl Default for SniperThresholds {
    fn default() -> Self {
        Self {
            nonce_small_level: 2,
            nonce_high_level: 50,
            same_delta_wei: 1_000_000_000_000_000,
            filter_nonce_count: 5,
            filter_snipers_count: 10,
            wallet_number_min: 3,
            double_sniper_wallet: 2,
            banana_gun_min_count: 5,
            banana_gun_rate: 0.5,
            maestro_rate: 0.5,
            mev_rate: 0.5,
        }
    }
}

/// Nonce profile of one token's snipers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnipeSummary {
    pub nonce_small_count: usize,
    pub nonce_high_count: usize,
    #[serde(rename = "BGCount")]
    pub banana_gun_count: usize,
    #[serde(rename = "MaestroCount")]
    pub maestro_count: usize,
    /// Distinct actors after (counterparty, value) clustering
    pub snipers: usize,
    pub sniper_tx_count: usize,
}

/// True if `values` already holds a buy through `to` within `delta` of `value`
pub fn check_same(values: &[(Counterparty, U256)], to: &Counterparty, value: U256, delta: U256) -> bool {
    values.iter().any(|(seen_to, seen_value)| {
        seen_to == to && seen_value.saturating_add(delta) >= value && seen_value.saturating_sub(delta) <= value
    })
}

/// Summarize one token's sniper rows
pub fn summarize(rows: &[SniperTx], thresholds: &SniperThresholds) -> SnipeSummary {
    let delta = U256::from(thresholds.same_delta_wei);
    let mut summary = SnipeSummary {
        sniper_tx_count: rows.len(),
        ..Default::default()
    };
    let mut actors: Vec<(Counterparty, U256)> = Vec::new();

    for row in rows {
        if row.to.is(KnownCounterparty::BananaGun) {
            summary.banana_gun_count += 1;
        } else if row.to.is(KnownCounterparty::Maestro) {
            summary.maestro_count += 1;
        }
        if !check_same(&actors, &row.to, row.value, delta) {
            actors.push((row.to, row.value));
        }
        if row.nonce <= thresholds.nonce_small_level {
            summary.nonce_small_count += 1;
        }
        if row.nonce >= thresholds.nonce_high_level {
            summary.nonce_high_count += 1;
        }
    }

    summary.snipers = actors.len();
    summary
}

/// True when nearly every nonce in `nonces` is the same small value.
///
/// A router that submits from freshly derived wallets produces the same
/// low nonce over and over, which says nothing about who is behind it.
pub fn is_nonce_same(nonces: &[u64]) -> bool {
    if nonces.is_empty() {
        return false;
    }
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for nonce in nonces {
        *counts.entry(*nonce).or_default() += 1;
    }
    counts
        .iter()
        .any(|(nonce, count)| *nonce < SAME_NONCE_CEILING && count + 3 > nonces.len())
}

/// A token that passed one of the screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenedToken {
    #[serde(flatten)]
    pub token: TokenRecord,
    pub special: bool,
    pub snipe_data: SnipeSummary,
}

/// Available screens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    /// Many fresh-wallet snipers
    Nonce,
    /// Nonce screen minus launches dominated by one router cluster
    Routers,
    /// Fresh-wallet snipers that bypass the tagged routers
    Mev,
    /// Repeated (counterparty, value) clusters of seasoned wallets
    Wallets,
}

fn group_by_token(rows: &[SniperTx]) -> HashMap<Address, Vec<SniperTx>> {
    let mut grouped: HashMap<Address, Vec<SniperTx>> = HashMap::new();
    for row in rows {
        grouped.entry(row.address).or_default().push(row.clone());
    }
    grouped
}

fn clusters<'a>(rows: impl Iterator<Item = &'a SniperTx>) -> HashMap<(Counterparty, U256), Vec<u64>> {
    let mut grouped: HashMap<(Counterparty, U256), Vec<u64>> = HashMap::new();
    for row in rows {
        grouped.entry((row.to, row.value)).or_default().push(row.nonce);
    }
    grouped
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

fn small_nonce_count<'a>(rows: impl Iterator<Item = &'a SniperTx>, t: &SniperThresholds) -> usize {
    rows.filter(|r| r.nonce <= t.nonce_small_level).count()
}

/// Router verdict: `None` eliminates the token, otherwise the special flag
fn router_verdict(rows: &[SniperTx], t: &SniperThresholds) -> Option<bool> {
    let total = rows.len();
    let mut special = false;
    for ((to, _), nonces) in clusters(rows.iter()) {
        let count = nonces.len();
        if to.is(KnownCounterparty::BananaGun) {
            if count > BANANA_GUN_SPECIAL_CAP.max(t.banana_gun_min_count) {
                special = true;
            } else if count <= BANANA_GUN_SPECIAL_CAP.min(t.banana_gun_min_count)
                && ratio(count, total) >= t.banana_gun_rate
            {
                return None;
            }
        } else if to.is(KnownCounterparty::Maestro) && ratio(count, total) >= t.maestro_rate {
            return None;
        }
    }
    Some(special)
}

fn wallet_verdict(rows: &[SniperTx], t: &SniperThresholds) -> bool {
    let seasoned = clusters(rows.iter().filter(|r| r.nonce > t.nonce_small_level));

    let qualifying: Vec<(&Counterparty, &Vec<u64>)> = seasoned
        .iter()
        .filter(|(_, nonces)| nonces.len() >= t.wallet_number_min)
        .map(|((to, _), nonces)| (to, nonces))
        .collect();
    if qualifying.is_empty() {
        return false;
    }

    let doubles = seasoned
        .values()
        .filter(|nonces| nonces.len() >= t.double_sniper_wallet)
        .count();
    if doubles < 2 {
        return false;
    }

    !qualifying.iter().any(|(to, nonces)| {
        (to.is(KnownCounterparty::BananaGun) || to.is(KnownCounterparty::Maestro)) && is_nonce_same(nonces)
    })
}

/// Run `kind` over `tokens`, newest first
pub fn screen(
    kind: ScreenKind,
    tokens: &[TokenRecord],
    rows: &[SniperTx],
    t: &SniperThresholds,
) -> Vec<ScreenedToken> {
    let by_token = group_by_token(rows);
    let mut passed = Vec::new();

    for token in tokens {
        let Some(rows) = by_token.get(&token.address) else {
            continue;
        };

        let special = match kind {
            ScreenKind::Nonce => {
                if small_nonce_count(rows.iter(), t) < t.filter_nonce_count {
                    continue;
                }
                false
            }
            ScreenKind::Routers => {
                if small_nonce_count(rows.iter(), t) < t.filter_nonce_count {
                    continue;
                }
                match router_verdict(rows, t) {
                    Some(special) => special,
                    None => continue,
                }
            }
            ScreenKind::Mev => {
                let untagged: Vec<&SniperTx> = rows.iter().filter(|r| !r.to.is_tagged()).collect();
                if small_nonce_count(untagged.iter().copied(), t) < t.filter_nonce_count {
                    continue;
                }
                ratio(untagged.len(), rows.len()) >= t.mev_rate
            }
            ScreenKind::Wallets => {
                if !wallet_verdict(rows, t) {
                    continue;
                }
                false
            }
        };

        let snipe_data = summarize(rows, t);
        if kind != ScreenKind::Wallets && snipe_data.snipers < t.filter_snipers_count {
            continue;
        }
        passed.push(ScreenedToken {
            token: token.clone(),
            special,
            snipe_data,
        });
    }

    passed.sort_by(|a, b| b.token.block_number.cmp(&a.token.block_number));
    passed
}

/// Store-backed entry point used by the CLI
pub struct SniperAnalytics {
    store: Arc<dyn LedgerStore>,
    thresholds: SniperThresholds,
}

impl SniperAnalytics {
    pub fn new(store: Arc<dyn LedgerStore>, thresholds: SniperThresholds) -> Self {
        Self { store, thresholds }
    }

    pub async fn summary(&self, token: Address) -> Result<SnipeSummary, StoreError> {
        let rows = self.store.sniper_txs(token).await?;
        Ok(summarize(&rows, &self.thresholds))
    }

    pub async fn screen(&self, kind: ScreenKind) -> Result<Vec<ScreenedToken>, StoreError> {
        let tokens = self.store.tokens().await?;
        let rows = self.store.all_sniper_txs().await?;
        Ok(screen(kind, &tokens, &rows, &self.thresholds))
    }
}
