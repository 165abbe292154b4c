//! Swap classification and first-block sniper capture.

use alloy::primitives::{Address, U256};
use tracing::{debug, info};

use super::{call_contract, ClassifyError, TxContext};
use crate::abi::IUniswapV2Pair;
use crate::chain::ChainClient;
use crate::config::DexConfig;
use crate::decoder::{DecodedEvent, DecodedLog};
use crate::ledger::LedgerTx;
use crate::notify::Topic;
use crate::pair::derive_pair_address;
use crate::types::{Counterparty, SniperTx, TokenRecord};

/// Direction of a swap relative to the tracked token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    /// Quote asset in, token out
    Buy,
    /// Token in, quote asset out
    Sell,
}

/// Amounts of a `Swap` log, pair slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapAmounts {
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

impl SwapAmounts {
    fn from_event(event: &DecodedEvent) -> Option<Self> {
        match *event {
            DecodedEvent::Swap {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
                ..
            } => Some(Self {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
            }),
            _ => None,
        }
    }
}

/// Side of the swap given whether the quote asset sits in slot 0
pub fn swap_side(quote_is_token0: bool, amounts: &SwapAmounts) -> SwapSide {
    let token1_out = !amounts.amount1_out.is_zero();
    match (token1_out, quote_is_token0) {
        // slot 1 paid out: the buyer received token1
        (true, true) => SwapSide::Buy,
        (true, false) => SwapSide::Sell,
        (false, true) => SwapSide::Sell,
        (false, false) => SwapSide::Buy,
    }
}

/// Size of the trade: the paid-out leg of a buy, the paid-in leg of a sell
pub fn trade_amount(side: SwapSide, amounts: &SwapAmounts) -> U256 {
    let (first, second) = match side {
        SwapSide::Buy => (amounts.amount0_out, amounts.amount1_out),
        SwapSide::Sell => (amounts.amount0_in, amounts.amount1_in),
    };
    if first.is_zero() {
        second
    } else {
        first
    }
}

/// Apply one classified swap to `record`.
///
/// # Returns
/// The notification topic and whether the swap is a first-block buy
pub fn apply_swap(record: &mut TokenRecord, side: SwapSide, amount: U256, block: u64) -> (Topic, bool) {
    let is_buy = side == SwapSide::Buy;
    let Some(first_block) = record.first_swap_block_number else {
        record.first_swap_block_number = Some(block);
        record.buy_count = u64::from(is_buy);
        record.sell_count = u64::from(!is_buy);
        record.first_block_buy_count = record.buy_count;
        record.first_block_sell_count = record.sell_count;
        record.max_trade_token_amount = amount;
        return (Topic::SwapEnabled, is_buy);
    };

    match side {
        SwapSide::Buy => record.buy_count += 1,
        SwapSide::Sell => record.sell_count += 1,
    }
    let in_first_block = block == first_block;
    if in_first_block {
        record.first_block_buy_count = record.buy_count;
        record.first_block_sell_count = record.sell_count;
    }
    record.max_trade_token_amount = record.max_trade_token_amount.max(amount);
    (Topic::Swapped, is_buy && in_first_block)
}

fn sniper_row(ctx: &TxContext<'_>, token: Address, to: Address) -> SniperTx {
    SniperTx {
        address: token,
        tx_hash: ctx.tx.hash,
        from: ctx.tx.from,
        to: Counterparty::resolve(to),
        nonce: ctx.tx.nonce,
        priority_fee: U256::from(ctx.tx.max_priority_fee_per_gas.unwrap_or_default()),
        gas_limit: ctx.tx.gas_limit,
        gas_used: ctx.receipt.gas_used,
        gas_fee: ctx.receipt.gas_fee(),
        value: ctx.tx.value,
        block_number: ctx.block_number(),
        position: ctx.position.tx,
    }
}

/// Re-derive the pool's tokens and check the pool really is the factory's
async fn verified_tokens(
    chain: &dyn ChainClient,
    dex: &DexConfig,
    pair: Address,
) -> Result<Option<(Address, Address)>, ClassifyError> {
    let Some(token0) = call_contract(chain, pair, IUniswapV2Pair::token0Call {}).await? else {
        return Ok(None);
    };
    let Some(token1) = call_contract(chain, pair, IUniswapV2Pair::token1Call {}).await? else {
        return Ok(None);
    };
    let (token0, token1) = (token0._0, token1._0);
    if derive_pair_address(dex.factory, token0, token1, dex.pair_init_code_hash) != pair {
        debug!(pair = %format!("{:#x}", pair), "swap from unrecognized pair");
        return Ok(None);
    }
    Ok(Some((token0, token1)))
}

/// Classify the first recognizable `Swap` of the transaction
pub async fn detect(
    chain: &dyn ChainClient,
    dex: &DexConfig,
    ctx: &TxContext<'_>,
    logs: &[DecodedLog],
    ledger: &mut LedgerTx<'_>,
) -> Result<(), ClassifyError> {
    for log in logs {
        let Some(amounts) = SwapAmounts::from_event(&log.event) else {
            continue;
        };
        let Some(mut record) = ledger.token_by_pair(log.address).await? else {
            continue;
        };
        let Some((token0, _)) = verified_tokens(chain, dex, log.address).await? else {
            continue;
        };

        let side = swap_side(token0 == dex.quote_asset, &amounts);
        let amount = trade_amount(side, &amounts);
        let block = ctx.block_number();
        let (topic, sniped) = apply_swap(&mut record, side, amount, block);

        if sniped {
            if let Some(to) = ctx.tx.to {
                ledger.record_sniper(sniper_row(ctx, record.address, to));
            }
        }
        info!(
            token = %format!("{:#x}", record.address),
            side = ?side,
            %amount,
            buys = record.buy_count,
            sells = record.sell_count,
            "swap"
        );
        ledger.save(record, Some(topic));
        return Ok(());
    }
    Ok(())
}
