//! Contract creation: probe a freshly deployed contract for the ERC-20
//! surface and open a record for it.

use alloy::primitives::Address;
use tracing::{debug, info};

use super::{call_contract, ClassifyError, TxContext};
use crate::abi::{IOwnable, IERC20};
use crate::chain::{ChainClient, ChainError};
use crate::ledger::LedgerTx;
use crate::notify::Topic;
use crate::types::TokenRecord;

async fn resolve_owner(chain: &dyn ChainClient, contract: Address, fallback: Address) -> Result<Address, ChainError> {
    if let Some(owner) = call_contract(chain, contract, IOwnable::ownerCall {}).await? {
        return Ok(owner._0);
    }
    if let Some(owner) = call_contract(chain, contract, IOwnable::getOwnerCall {}).await? {
        return Ok(owner._0);
    }
    Ok(fallback)
}

pub async fn detect(
    chain: &dyn ChainClient,
    ctx: &TxContext<'_>,
    contract: Address,
    ledger: &mut LedgerTx<'_>,
) -> Result<(), ClassifyError> {
    if ledger.token_by_address(contract).await?.is_some() {
        return Ok(());
    }

    let Some(name) = call_contract(chain, contract, IERC20::nameCall {}).await? else {
        return Ok(());
    };
    let Some(symbol) = call_contract(chain, contract, IERC20::symbolCall {}).await? else {
        return Ok(());
    };
    let Some(decimals) = call_contract(chain, contract, IERC20::decimalsCall {}).await? else {
        return Ok(());
    };
    if decimals._0 == 0 {
        debug!(contract = %format!("{:#x}", contract), "zero decimals; not a fungible token");
        return Ok(());
    }
    let Some(total_supply) = call_contract(chain, contract, IERC20::totalSupplyCall {}).await? else {
        return Ok(());
    };
    let owner = resolve_owner(chain, contract, ctx.tx.from).await?;

    let record = TokenRecord {
        name: name._0,
        symbol: symbol._0,
        decimals: decimals._0,
        owner,
        total_supply: total_supply._0,
        token_creation_hash: ctx.tx.hash,
        block_number: ctx.block_number(),
        ..TokenRecord::new(contract)
    };
    info!(
        token = %format!("{:#x}", contract),
        symbol = %record.symbol,
        block = ctx.block_number(),
        "new token"
    );
    ledger.save(record, Some(Topic::NewContractCreated));
    Ok(())
}
