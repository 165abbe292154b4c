//! Pool liquidity: the first add, removals, and the pair's LP token supply.

use tracing::{debug, info};

use super::ClassifyError;
use crate::constants::BURN_ADDRESS;
use crate::decoder::{DecodedEvent, DecodedLog};
use crate::ledger::LedgerTx;

/// First `Mint` on a tracked pair records the opening liquidity. LP tokens
/// minted by that pair grow the LP supply counters.
pub async fn detect_add(logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    for log in logs {
        match log.event {
            DecodedEvent::Mint { amount0, amount1, .. } => {
                let Some(mut record) = ledger.token_by_pair(log.address).await? else {
                    continue;
                };
                if record.liquidity_token.is_some() {
                    continue;
                }
                let Some((token_amount, quote_amount)) = record.split_pair_amounts(amount0, amount1) else {
                    continue;
                };
                record.liquidity_token = Some(token_amount);
                record.liquidity_eth = Some(quote_amount);
                info!(
                    token = %format!("{:#x}", record.address),
                    %token_amount,
                    %quote_amount,
                    "liquidity added"
                );
                ledger.save(record, None);
            }
            DecodedEvent::Transfer { from, to, value } if from == BURN_ADDRESS && to != BURN_ADDRESS => {
                let Some(mut record) = ledger.token_by_pair(log.address).await? else {
                    continue;
                };
                record.total_lp_amount = record.total_lp_amount.saturating_add(value);
                record.current_lp_amount = record.current_lp_amount.saturating_add(value);
                debug!(pair = %format!("{:#x}", log.address), %value, "lp minted");
                ledger.save(record, None);
            }
            _ => {}
        }
    }
    Ok(())
}

/// `Burn` on a tracked pair records the liquidity taken out
pub async fn detect_remove(logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    for log in logs {
        let DecodedEvent::Burn { amount0, amount1, .. } = log.event else {
            continue;
        };
        let Some(mut record) = ledger.token_by_pair(log.address).await? else {
            continue;
        };
        let Some((token_amount, quote_amount)) = record.split_pair_amounts(amount0, amount1) else {
            continue;
        };
        record.removed_liquidity_token = Some(token_amount);
        record.removed_liquidity_eth = Some(quote_amount);
        info!(token = %format!("{:#x}", record.address), %quote_amount, "liquidity removed");
        ledger.save(record, None);
    }
    Ok(())
}

/// LP tokens sent to the zero address leave circulation
pub async fn detect_lp_burn(logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    for log in logs {
        let DecodedEvent::Transfer { from, to, value } = log.event else {
            continue;
        };
        if to != BURN_ADDRESS || from == BURN_ADDRESS {
            continue;
        }
        let Some(mut record) = ledger.token_by_pair(log.address).await? else {
            continue;
        };
        record.current_lp_amount = record.current_lp_amount.saturating_sub(value);
        debug!(pair = %format!("{:#x}", log.address), %value, "lp burned");
        ledger.save(record, None);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WETH;
    use crate::notify::LogNotifier;
    use crate::store::{MemoryStore, TokenStore};
    use crate::types::{TokenRecord, TxPosition};
    use alloy::primitives::{address, Address, U256};

    // Below WETH numerically, so amount0 is the token side
    const LOW_TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    // Above WETH numerically, so amount1 is the token side
    const HIGH_TOKEN: Address = address!("f0000000000000000000000000000000000000a1");
    const PAIR: Address = address!("00000000000000000000000000000000000000b1");
    const PROVIDER: Address = address!("00000000000000000000000000000000000000c1");

    fn paired(token: Address) -> TokenRecord {
        TokenRecord {
            pair: Some(PAIR),
            pair_token: Some(WETH),
            ..TokenRecord::new(token)
        }
    }

    fn on_pair(event: DecodedEvent) -> DecodedLog {
        DecodedLog { address: PAIR, event }
    }

    fn mint(amount0: u64, amount1: u64) -> DecodedLog {
        on_pair(DecodedEvent::Mint {
            sender: PROVIDER,
            amount0: U256::from(amount0),
            amount1: U256::from(amount1),
        })
    }

    fn lp_transfer(from: Address, to: Address, value: u64) -> DecodedLog {
        on_pair(DecodedEvent::Transfer {
            from,
            to,
            value: U256::from(value),
        })
    }

    async fn stored(store: &MemoryStore, token: Address) -> TokenRecord {
        store.token_by_address(token).await.unwrap().unwrap()
    }

    // ==================== add liquidity tests ====================

    #[tokio::test]
    async fn test_split_low_token_takes_amount0() {
        let store = MemoryStore::new();
        store.insert_token(paired(LOW_TOKEN));
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_add(&[mint(700, 3)], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let record = stored(&store, LOW_TOKEN).await;
        assert_eq!(record.liquidity_token, Some(U256::from(700)));
        assert_eq!(record.liquidity_eth, Some(U256::from(3)));
    }

    #[tokio::test]
    async fn test_split_high_token_takes_amount1() {
        let store = MemoryStore::new();
        store.insert_token(paired(HIGH_TOKEN));
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_add(&[mint(3, 700)], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let record = stored(&store, HIGH_TOKEN).await;
        assert_eq!(record.liquidity_token, Some(U256::from(700)));
        assert_eq!(record.liquidity_eth, Some(U256::from(3)));
    }

    #[tokio::test]
    async fn test_only_first_mint_counts() {
        let store = MemoryStore::new();
        store.insert_token(paired(LOW_TOKEN));

        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_add(&[mint(700, 3)], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let mut ledger = LedgerTx::new(&store, TxPosition::new(2, 0));
        detect_add(&[mint(9_000, 9)], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        assert_eq!(stored(&store, LOW_TOKEN).await.liquidity_token, Some(U256::from(700)));
    }

    // ==================== LP supply tests ====================

    #[tokio::test]
    async fn test_lp_mint_and_burn() {
        let store = MemoryStore::new();
        store.insert_token(paired(LOW_TOKEN));
        let logs = vec![
            lp_transfer(BURN_ADDRESS, BURN_ADDRESS, 1_000),
            lp_transfer(BURN_ADDRESS, PROVIDER, 9_000),
        ];
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_add(&logs, &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let record = stored(&store, LOW_TOKEN).await;
        assert_eq!(record.total_lp_amount, U256::from(9_000));
        assert_eq!(record.current_lp_amount, U256::from(9_000));

        let logs = vec![lp_transfer(PROVIDER, PAIR, 4_000), lp_transfer(PAIR, BURN_ADDRESS, 4_000)];
        let mut ledger = LedgerTx::new(&store, TxPosition::new(2, 0));
        detect_lp_burn(&logs, &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let record = stored(&store, LOW_TOKEN).await;
        assert_eq!(record.total_lp_amount, U256::from(9_000));
        assert_eq!(record.current_lp_amount, U256::from(5_000));
    }

    #[tokio::test]
    async fn test_lp_burn_saturates() {
        let store = MemoryStore::new();
        store.insert_token(paired(LOW_TOKEN));
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_lp_burn(&[lp_transfer(PROVIDER, BURN_ADDRESS, 10)], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();
        assert_eq!(stored(&store, LOW_TOKEN).await.current_lp_amount, U256::ZERO);
    }

    #[tokio::test]
    async fn test_transfer_on_unknown_pair_is_noop() {
        let store = MemoryStore::new();
        let logs = vec![lp_transfer(
            address!("000000000000000000000000000000000000dEaD"),
            address!("000000000000000000000000000000000000bEEF"),
            500,
        )];
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_add(&logs, &mut ledger).await.unwrap();
        detect_lp_burn(&logs, &mut ledger).await.unwrap();
        assert!(ledger.batch().is_empty());
        assert_eq!(store.token_count(), 0);
    }

    // ==================== remove liquidity tests ====================

    #[tokio::test]
    async fn test_burn_records_removed_amounts() {
        let store = MemoryStore::new();
        store.insert_token(paired(HIGH_TOKEN));
        let burn = on_pair(DecodedEvent::Burn {
            sender: PROVIDER,
            amount0: U256::from(2),
            amount1: U256::from(500),
            to: PROVIDER,
        });
        let mut ledger = LedgerTx::new(&store, TxPosition::new(1, 0));
        detect_remove(&[burn], &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();

        let record = stored(&store, HIGH_TOKEN).await;
        assert_eq!(record.removed_liquidity_token, Some(U256::from(500)));
        assert_eq!(record.removed_liquidity_eth, Some(U256::from(2)));
    }
}
