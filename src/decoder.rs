//! Log Decoder
//!
//! Decodes receipt logs against the fixed registry of events the classifier
//! understands. Also holds the calldata helpers used by selector-based
//! detectors.

use alloy::primitives::{Address, B256, U256};
use alloy::sol_types::SolEvent;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

use crate::abi::{IUnicryptLocker, IUniswapV2Factory, IUniswapV2Pair, ITeamFinanceLock, IERC20};
use crate::chain::RawLog;
use crate::constants::PINKLOCK_LOCK_ADDED_TOPIC;

/// Errors that can occur during log or calldata decoding
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Failed to decode {event} log: {reason}")]
    Abi { event: &'static str, reason: String },

    #[error("{event} log data too short: {len} bytes")]
    Truncated { event: &'static str, len: usize },

    #[error("Transaction input too short for method extraction")]
    InputTooShort,

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Events present in the decoder registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transfer,
    Sync,
    Mint,
    Burn,
    Swap,
    PairCreated,
    TeamFinanceDeposit,
    UnicryptDeposit,
    PinkLockAdded,
}

impl EventKind {
    /// topic0 of the event
    pub fn topic(&self) -> B256 {
        match self {
            EventKind::Transfer => IERC20::Transfer::SIGNATURE_HASH,
            EventKind::Sync => IUniswapV2Pair::Sync::SIGNATURE_HASH,
            EventKind::Mint => IUniswapV2Pair::Mint::SIGNATURE_HASH,
            EventKind::Burn => IUniswapV2Pair::Burn::SIGNATURE_HASH,
            EventKind::Swap => IUniswapV2Pair::Swap::SIGNATURE_HASH,
            EventKind::PairCreated => IUniswapV2Factory::PairCreated::SIGNATURE_HASH,
            EventKind::TeamFinanceDeposit => ITeamFinanceLock::Deposit::SIGNATURE_HASH,
            EventKind::UnicryptDeposit => IUnicryptLocker::onDeposit::SIGNATURE_HASH,
            EventKind::PinkLockAdded => PINKLOCK_LOCK_ADDED_TOPIC,
        }
    }

    /// Event name as it appears in the contract ABI
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Transfer => "Transfer",
            EventKind::Sync => "Sync",
            EventKind::Mint => "Mint",
            EventKind::Burn => "Burn",
            EventKind::Swap => "Swap",
            EventKind::PairCreated => "PairCreated",
            EventKind::TeamFinanceDeposit => "Deposit",
            EventKind::UnicryptDeposit => "onDeposit",
            EventKind::PinkLockAdded => "LockAdded",
        }
    }
}

static EVENT_REGISTRY: LazyLock<HashMap<B256, EventKind>> = LazyLock::new(|| {
    [
        EventKind::Transfer,
        EventKind::Sync,
        EventKind::Mint,
        EventKind::Burn,
        EventKind::Swap,
        EventKind::PairCreated,
        EventKind::TeamFinanceDeposit,
        EventKind::UnicryptDeposit,
        EventKind::PinkLockAdded,
    ]
    .into_iter()
    .map(|kind| (kind.topic(), kind))
    .collect()
});

/// Look up a topic0 in the registry
pub fn event_kind(topic0: &B256) -> Option<EventKind> {
    EVENT_REGISTRY.get(topic0).copied()
}

/// Decoded event body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    Transfer { from: Address, to: Address, value: U256 },
    Sync { reserve0: U256, reserve1: U256 },
    Mint { sender: Address, amount0: U256, amount1: U256 },
    Burn { sender: Address, amount0: U256, amount1: U256, to: Address },
    Swap {
        sender: Address,
        amount0_in: U256,
        amount1_in: U256,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    },
    PairCreated { token0: Address, token1: Address, pair: Address },
    TeamFinanceDeposit { token: Address, withdrawal: Address, amount: U256, unlock_time: U256 },
    UnicryptDeposit { lp_token: Address, user: Address, amount: U256, unlock_date: U256 },
    PinkLockAdded { token: Address, owner: Address, amount: U256, unlock_date: U256 },
}

/// A decoded log together with the contract that emitted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub address: Address,
    pub event: DecodedEvent,
}

fn abi_error(kind: EventKind, err: alloy::sol_types::Error) -> DecodeError {
    DecodeError::Abi {
        event: kind.name(),
        reason: err.to_string(),
    }
}

/// Decode one log.
///
/// # Returns
/// `Ok(None)` when topic0 is not in the registry, `Err` when it is but the
/// body does not match the event layout.
pub fn decode_log(log: &RawLog) -> Result<Option<DecodedLog>, DecodeError> {
    let Some(kind) = log.topic0().and_then(event_kind) else {
        return Ok(None);
    };
    let topics = log.topics.iter().copied();
    let data = log.data.as_ref();

    let event = match kind {
        EventKind::Transfer => {
            let ev = IERC20::Transfer::decode_raw_log(topics, data, true).map_err(|e| abi_error(kind, e))?;
            DecodedEvent::Transfer {
                from: ev.from,
                to: ev.to,
                value: ev.value,
            }
        }
        EventKind::Sync => {
            let ev = IUniswapV2Pair::Sync::decode_raw_log(topics, data, true).map_err(|e| abi_error(kind, e))?;
            DecodedEvent::Sync {
                reserve0: U256::from(ev.reserve0),
                reserve1: U256::from(ev.reserve1),
            }
        }
        EventKind::Mint => {
            let ev = IUniswapV2Pair::Mint::decode_raw_log(topics, data, true).map_err(|e| abi_error(kind, e))?;
            DecodedEvent::Mint {
                sender: ev.sender,
                amount0: ev.amount0,
                amount1: ev.amount1,
            }
        }
        EventKind::Burn => {
            let ev = IUniswapV2Pair::Burn::decode_raw_log(topics, data, true).map_err(|e| abi_error(kind, e))?;
            DecodedEvent::Burn {
                sender: ev.sender,
                amount0: ev.amount0,
                amount1: ev.amount1,
                to: ev.to,
            }
        }
        EventKind::Swap => {
            let ev = IUniswapV2Pair::Swap::decode_raw_log(topics, data, true).map_err(|e| abi_error(kind, e))?;
            DecodedEvent::Swap {
                sender: ev.sender,
                amount0_in: ev.amount0In,
                amount1_in: ev.amount1In,
                amount0_out: ev.amount0Out,
                amount1_out: ev.amount1Out,
                to: ev.to,
            }
        }
        EventKind::PairCreated => {
            let ev = IUniswapV2Factory::PairCreated::decode_raw_log(topics, data, true)
                .map_err(|e| abi_error(kind, e))?;
            DecodedEvent::PairCreated {
                token0: ev.token0,
                token1: ev.token1,
                pair: ev.pair,
            }
        }
        EventKind::TeamFinanceDeposit => {
            let ev = ITeamFinanceLock::Deposit::decode_raw_log(topics, data, true)
                .map_err(|e| abi_error(kind, e))?;
            DecodedEvent::TeamFinanceDeposit {
                token: ev.tokenAddress,
                withdrawal: ev.withdrawalAddress,
                amount: ev.amount,
                unlock_time: ev.unlockTime,
            }
        }
        EventKind::UnicryptDeposit => {
            let ev = IUnicryptLocker::onDeposit::decode_raw_log(topics, data, true)
                .map_err(|e| abi_error(kind, e))?;
            DecodedEvent::UnicryptDeposit {
                lp_token: ev.lpToken,
                user: ev.user,
                amount: ev.amount,
                unlock_date: ev.unlockDate,
            }
        }
        EventKind::PinkLockAdded => decode_pinklock(data)?,
    };

    Ok(Some(DecodedLog {
        address: log.address,
        event,
    }))
}

/// PinkLock's data words: token, owner, amount, unlockDate
fn decode_pinklock(data: &[u8]) -> Result<DecodedEvent, DecodeError> {
    if data.len() < 128 {
        return Err(DecodeError::Truncated {
            event: EventKind::PinkLockAdded.name(),
            len: data.len(),
        });
    }
    Ok(DecodedEvent::PinkLockAdded {
        token: Address::from_slice(&data[12..32]),
        owner: Address::from_slice(&data[44..64]),
        amount: U256::from_be_slice(&data[64..96]),
        unlock_date: U256::from_be_slice(&data[96..128]),
    })
}

/// Decode every log of a receipt in order, skipping unknown events.
///
/// Any malformed known event fails the whole set.
pub fn decode_logs(logs: &[RawLog]) -> Result<Vec<DecodedLog>, DecodeError> {
    let mut decoded = Vec::with_capacity(logs.len());
    for log in logs {
        if let Some(entry) = decode_log(log)? {
            decoded.push(entry);
        }
    }
    Ok(decoded)
}

/// Extract method ID from transaction input data
///
/// # Arguments
/// * `input` - The transaction input/calldata
///
/// # Returns
/// `Some([u8; 4])` if input has at least 4 bytes, `None` otherwise
pub fn extract_method_id(input: &[u8]) -> Option<[u8; 4]> {
    if input.len() < 4 {
        return None;
    }
    let mut method_id = [0u8; 4];
    method_id.copy_from_slice(&input[..4]);
    Some(method_id)
}

/// The `index`th 32-byte argument word after the selector
pub fn calldata_word(input: &[u8], index: usize) -> Option<U256> {
    let start = 4 + index * 32;
    let word = input.get(start..start + 32)?;
    Some(U256::from_be_slice(word))
}

/// Address held in the trailing 20 bytes of the calldata
pub fn calldata_trailing_address(input: &[u8]) -> Result<Address, DecodeError> {
    if input.len() < 24 {
        return Err(DecodeError::InputTooShort);
    }
    Ok(Address::from_slice(&input[input.len() - 20..]))
}

/// Parse a hex string to bytes (with or without 0x prefix)
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>, DecodeError> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| DecodeError::InvalidHex(e.to_string()))
}

/// Clamp a uint256 timestamp into seconds since epoch
pub fn timestamp_u64(value: U256) -> u64 {
    value.saturating_to::<u64>()
}
