//! Limit removal: owner calls that lift or change trading limits.

use tracing::info;

use super::{ClassifyError, TxContext};
use crate::decoder::calldata_word;
use crate::ledger::LedgerTx;
use crate::notify::Topic;
use crate::selectors::{match_input, GovernanceAction};

pub async fn detect(ctx: &TxContext<'_>, ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    let Some(token) = ctx.tx.to else {
        return Ok(());
    };
    let Some(method) = match_input(&ctx.tx.input) else {
        return Ok(());
    };
    let action = method.action();
    if action.is_ownership() {
        return Ok(());
    }
    let Some(mut record) = ledger.token_by_address(token).await? else {
        return Ok(());
    };

    let hash = Some(ctx.tx.hash);
    let amount = calldata_word(&ctx.tx.input, 0);
    match action {
        GovernanceAction::RemoveLimits => record.remove_limits_hash = hash,
        GovernanceAction::SetMaxWallet => {
            if amount.is_some() {
                record.max_wallet_size = amount;
            }
            record.set_max_wallet_size_hash = hash;
        }
        GovernanceAction::SetMaxTx => {
            if amount.is_some() {
                record.max_tx_amount = amount;
            }
            record.set_max_tx_amount_hash = hash;
        }
        GovernanceAction::Renounce | GovernanceAction::TransferOwnership => return Ok(()),
    }

    info!(token = %format!("{:#x}", token), method = method.name(), "limits changed");
    ledger.save(record, Some(Topic::LimitRemoved));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainTransaction, TxReceipt};
    use crate::notify::MockNotifier;
    use crate::selectors::GovernanceMethod;
    use crate::store::{MemoryStore, TokenStore};
    use crate::types::{TokenRecord, TxPosition};
    use alloy::primitives::{address, Address, Bytes, B256, U256};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");

    fn calldata(method: GovernanceMethod, arg: Option<u64>) -> Bytes {
        let mut data = method.selector().to_vec();
        if let Some(arg) = arg {
            data.extend_from_slice(&U256::from(arg).to_be_bytes::<32>());
        }
        data.into()
    }

    async fn run(method: GovernanceMethod, arg: Option<u64>, publishes: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord::new(TOKEN));
        let tx = ChainTransaction {
            hash: B256::with_last_byte(0x77),
            to: Some(TOKEN),
            input: calldata(method, arg),
            ..Default::default()
        };
        let receipt = TxReceipt {
            to: Some(TOKEN),
            status: true,
            ..Default::default()
        };
        let ctx = TxContext::new(TxPosition::new(5, 1), &tx, &receipt);
        let mut ledger = LedgerTx::new(&store, ctx.position);
        detect(&ctx, &mut ledger).await.unwrap();

        let mut notifier = MockNotifier::new();
        notifier
            .expect_publish()
            .withf(|n| n.topic == Topic::LimitRemoved)
            .times(publishes)
            .return_const(());
        ledger.commit(&notifier).await.unwrap();
        store
    }

    async fn record(store: &MemoryStore) -> TokenRecord {
        store.token_by_address(TOKEN).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_remove_limits_variants() {
        for method in [
            GovernanceMethod::RemoveLimits,
            GovernanceMethod::RemoveLimitsAlt,
            GovernanceMethod::MaxLimits,
        ] {
            let store = run(method, None, 1).await;
            assert_eq!(record(&store).await.remove_limits_hash, Some(B256::with_last_byte(0x77)));
        }
    }

    #[tokio::test]
    async fn test_change_max_wallet_amount_persists() {
        let store = run(GovernanceMethod::ChangeMaxWalletAmount, Some(20_000), 1).await;
        let record = record(&store).await;
        assert_eq!(record.max_wallet_size, Some(U256::from(20_000)));
        assert_eq!(record.set_max_wallet_size_hash, Some(B256::with_last_byte(0x77)));
    }

    #[tokio::test]
    async fn test_set_max_tx_variants_update_tx_amount() {
        for method in [
            GovernanceMethod::SetMaxTxnAmount,
            GovernanceMethod::ChangeMaxTxAmount,
            GovernanceMethod::SetMaxTxAmount,
        ] {
            let store = run(method, Some(300), 1).await;
            let record = record(&store).await;
            assert_eq!(record.max_tx_amount, Some(U256::from(300)));
            assert!(record.max_wallet_size.is_none());
        }
    }

    #[tokio::test]
    async fn test_missing_argument_keeps_hash_only() {
        let store = run(GovernanceMethod::SetMaxWalletSize, None, 1).await;
        let record = record(&store).await;
        assert!(record.max_wallet_size.is_none());
        assert!(record.set_max_wallet_size_hash.is_some());
    }

    #[tokio::test]
    async fn test_ownership_calls_are_not_limits() {
        let store = run(GovernanceMethod::RenounceOwnership, None, 0).await;
        assert!(record(&store).await.remove_limits_hash.is_none());
    }
}
