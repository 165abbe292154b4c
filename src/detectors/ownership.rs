//! Ownership changes: renounce and transfer.

use tracing::{info, warn};

use super::{ClassifyError, TxContext};
use crate::decoder::calldata_trailing_address;
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
    if !action.is_ownership() {
        return Ok(());
    }
    let Some(mut record) = ledger.token_by_address(token).await? else {
        return Ok(());
    };

    match action {
        GovernanceAction::Renounce => {
            record.renounce_ownership_hash = Some(ctx.tx.hash);
        }
        GovernanceAction::TransferOwnership => {
            let new_owner = match calldata_trailing_address(&ctx.tx.input) {
                Ok(owner) => owner,
                Err(err) => {
                    warn!(tx = %format!("{:#x}", ctx.tx.hash), %err, "transferOwnership without an argument");
                    return Ok(());
                }
            };
            record.updated_owner = Some(new_owner);
            record.transfer_ownership_hash = Some(ctx.tx.hash);
        }
        _ => return Ok(()),
    }

    info!(token = %format!("{:#x}", token), method = method.name(), "ownership changed");
    ledger.save(record, Some(Topic::Renounced));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainTransaction, TxReceipt};
    use crate::notify::LogNotifier;
    use crate::selectors::GovernanceMethod;
    use crate::store::{MemoryStore, TokenStore};
    use crate::types::{TokenRecord, TxPosition};
    use alloy::primitives::{address, Address, Bytes, B256};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    const NEW_OWNER: Address = address!("1234567890123456789012345678901234567890");

    async fn run(to: Option<Address>, input: Bytes) -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord::new(TOKEN));
        let tx = ChainTransaction {
            hash: B256::with_last_byte(0x99),
            to,
            input,
            ..Default::default()
        };
        let receipt = TxReceipt {
            to,
            status: true,
            ..Default::default()
        };
        let ctx = TxContext::new(TxPosition::new(8, 0), &tx, &receipt);
        let mut ledger = LedgerTx::new(&store, ctx.position);
        detect(&ctx, &mut ledger).await.unwrap();
        ledger.commit(&LogNotifier).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_renounce() {
        let input = GovernanceMethod::RenounceOwnership.selector().to_vec().into();
        let store = run(Some(TOKEN), input).await;
        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.renounce_ownership_hash, Some(B256::with_last_byte(0x99)));
    }

    #[tokio::test]
    async fn test_transfer_ownership_reads_trailing_address() {
        let mut input = GovernanceMethod::TransferOwnership.selector().to_vec();
        input.extend_from_slice(&[0u8; 12]);
        input.extend_from_slice(NEW_OWNER.as_slice());
        let store = run(Some(TOKEN), input.into()).await;

        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.updated_owner, Some(NEW_OWNER));
        assert_eq!(record.transfer_ownership_hash, Some(B256::with_last_byte(0x99)));
    }

    #[tokio::test]
    async fn test_transfer_ownership_without_argument_is_ignored() {
        let input = GovernanceMethod::TransferOwnership.selector().to_vec().into();
        let store = run(Some(TOKEN), input).await;
        assert!(store.token_by_address(TOKEN).await.unwrap().unwrap().updated_owner.is_none());
    }

    #[tokio::test]
    async fn test_unknown_token_is_ignored() {
        let input = GovernanceMethod::RenounceOwnership.selector().to_vec().into();
        let store = run(Some(NEW_OWNER), input).await;
        assert!(store.token_by_address(TOKEN).await.unwrap().unwrap().renounce_ownership_hash.is_none());
    }
}
