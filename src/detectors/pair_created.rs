//! Pair creation: link a token to its quote-asset pool.

use tracing::info;

use super::ClassifyError;
use crate::config::DexConfig;
use crate::decoder::{DecodedEvent, DecodedLog};
use crate::ledger::LedgerTx;

pub async fn detect(dex: &DexConfig, logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    for log in logs {
        let DecodedEvent::PairCreated { token0, token1, pair } = log.event else {
            continue;
        };
        if log.address != dex.factory {
            continue;
        }
        let token = match (token0 == dex.quote_asset, token1 == dex.quote_asset) {
            (true, false) => token1,
            (false, true) => token0,
            _ => continue,
        };
        let Some(mut record) = ledger.token_by_address(token).await? else {
            continue;
        };
        if record.pair.is_some() {
            continue;
        }
        record.pair = Some(pair);
        record.pair_token = Some(dex.quote_asset);
        info!(token = %format!("{:#x}", token), pair = %format!("{:#x}", pair), "pair created");
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
    use alloy::primitives::{address, Address};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    const OTHER: Address = address!("00000000000000000000000000000000000000a2");
    const PAIR: Address = address!("00000000000000000000000000000000000000b1");
    const SECOND_PAIR: Address = address!("00000000000000000000000000000000000000b2");

    fn pair_created(emitter: Address, token0: Address, token1: Address, pair: Address) -> DecodedLog {
        DecodedLog {
            address: emitter,
            event: DecodedEvent::PairCreated { token0, token1, pair },
        }
    }

    async fn apply(store: &MemoryStore, block: u64, logs: &[DecodedLog]) {
        let dex = DexConfig::default();
        let mut ledger = LedgerTx::new(store, TxPosition::new(block, 0));
        detect(&dex, logs, &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();
    }

    #[tokio::test]
    async fn test_links_token_either_side() {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord::new(TOKEN));
        let factory = DexConfig::default().factory;

        apply(&store, 1, &[pair_created(factory, WETH, TOKEN, PAIR)]).await;
        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.pair, Some(PAIR));
        assert_eq!(record.pair_token, Some(WETH));
        assert_eq!(store.token_by_pair(PAIR).await.unwrap().unwrap().address, TOKEN);
    }

    #[tokio::test]
    async fn test_first_pair_wins() {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord::new(TOKEN));
        let factory = DexConfig::default().factory;

        apply(&store, 1, &[pair_created(factory, TOKEN, WETH, PAIR)]).await;
        apply(&store, 2, &[pair_created(factory, TOKEN, WETH, SECOND_PAIR)]).await;
        assert_eq!(store.token_by_address(TOKEN).await.unwrap().unwrap().pair, Some(PAIR));
    }

    #[tokio::test]
    async fn test_ignores_other_factories_and_non_quote_pairs() {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord::new(TOKEN));
        store.insert_token(TokenRecord::new(OTHER));
        let factory = DexConfig::default().factory;

        apply(
            &store,
            1,
            &[
                pair_created(OTHER, TOKEN, WETH, PAIR),
                pair_created(factory, TOKEN, OTHER, PAIR),
            ],
        )
        .await;
        assert!(store.token_by_address(TOKEN).await.unwrap().unwrap().pair.is_none());
        assert!(store.token_by_address(OTHER).await.unwrap().unwrap().pair.is_none());
    }
}
