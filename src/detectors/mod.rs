//! Event Classifier
//!
//! Interprets one transaction's receipt and decoded logs and stages the
//! resulting token-record updates on a [`LedgerTx`]. Detectors run in a
//! fixed order; a contract creation never also runs lock or limit
//! detection since it has no `to`.

use alloy::primitives::Address;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::chain::{ChainClient, ChainError, ChainTransaction, TxReceipt};
use crate::config::DexConfig;
use crate::decoder::{decode_logs, DecodedLog};
use crate::ledger::LedgerTx;
use crate::store::StoreError;
use crate::types::TxPosition;

pub mod creation;
pub mod liquidity;
pub mod limits;
pub mod lock;
pub mod mint;
pub mod ownership;
pub mod pair_created;
pub mod swap;

/// Errors that abort classification of a transaction
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// The transaction being classified
#[derive(Debug, Clone, Copy)]
pub struct TxContext<'a> {
    pub position: TxPosition,
    pub tx: &'a ChainTransaction,
    pub receipt: &'a TxReceipt,
}

impl<'a> TxContext<'a> {
    pub fn new(position: TxPosition, tx: &'a ChainTransaction, receipt: &'a TxReceipt) -> Self {
        Self { position, tx, receipt }
    }

    pub fn block_number(&self) -> u64 {
        self.position.block
    }
}

/// Run `call` against `to`.
///
/// # Returns
/// `Ok(None)` if the call reverted or its return data does not decode;
/// transport failures are returned as errors
pub async fn call_contract<C: SolCall>(
    chain: &dyn ChainClient,
    to: Address,
    call: C,
) -> Result<Option<C::Return>, ChainError> {
    match chain.call(to, call.abi_encode().into()).await {
        Ok(data) => Ok(C::abi_decode_returns(&data, true).ok()),
        Err(err) if err.is_revert() => Ok(None),
        Err(err) => Err(err),
    }
}

pub struct Classifier {
    chain: Arc<dyn ChainClient>,
    dex: DexConfig,
}

impl Classifier {
    pub fn new(chain: Arc<dyn ChainClient>, dex: DexConfig) -> Self {
        Self { chain, dex }
    }

    pub fn dex(&self) -> &DexConfig {
        &self.dex
    }

    /// Classify one successful transaction, staging writes on `ledger`
    pub async fn classify(&self, ctx: &TxContext<'_>, ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
        let logs: Vec<DecodedLog> = match decode_logs(&ctx.receipt.logs) {
            Ok(logs) => logs,
            Err(err) => {
                debug!(tx = %format!("{:#x}", ctx.tx.hash), %err, "undecodable logs; skipping log detectors");
                Vec::new()
            }
        };

        if let Some(contract) = ctx.receipt.created_contract() {
            creation::detect(self.chain.as_ref(), ctx, contract, ledger).await?;
        } else {
            lock::detect(ctx, &logs, ledger).await?;
            limits::detect(ctx, ledger).await?;
        }
        ownership::detect(ctx, ledger).await?;

        if logs.is_empty() {
            return Ok(());
        }
        mint::detect(&logs, ledger).await?;
        pair_created::detect(&self.dex, &logs, ledger).await?;
        liquidity::detect_add(&logs, ledger).await?;
        liquidity::detect_remove(&logs, ledger).await?;
        liquidity::detect_lp_burn(&logs, ledger).await?;
        swap::detect(self.chain.as_ref(), &self.dex, ctx, &logs, ledger).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedCalls;
    use super::*;
    use crate::abi::IERC20;
    use alloy::primitives::{address, U256};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");

    // ==================== call_contract tests ====================

    #[tokio::test]
    async fn test_call_contract_decodes_return() {
        let chain = ScriptedCalls::new();
        chain.respond::<IERC20::totalSupplyCall, _>(TOKEN, U256::from(1_000));

        let supply = call_contract(&chain, TOKEN, IERC20::totalSupplyCall {}).await.unwrap();
        assert_eq!(supply.map(|r| r._0), Some(U256::from(1_000)));
    }

    #[tokio::test]
    async fn test_call_contract_revert_is_none() {
        let chain = ScriptedCalls::new();
        let name = call_contract(&chain, TOKEN, IERC20::nameCall {}).await.unwrap();
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_call_contract_garbage_return_is_none() {
        let chain = ScriptedCalls::new();
        chain.respond::<IERC20::nameCall, _>(TOKEN, U256::from(3));
        // a bare word is not a valid dynamic string encoding
        let name = call_contract(&chain, TOKEN, IERC20::nameCall {}).await.unwrap();
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn test_call_contract_transport_error_propagates() {
        let chain = ScriptedCalls::new();
        chain.fail::<IERC20::nameCall>(TOKEN, ChainError::Rpc("connection reset".into()));
        let result = call_contract(&chain, TOKEN, IERC20::nameCall {}).await;
        assert!(matches!(result, Err(ChainError::Rpc(_))));
    }
}
