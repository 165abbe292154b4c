//! Chain Constants
//!
//! Well-known Ethereum mainnet addresses the classifier keys on.

use alloy::primitives::{address, b256, Address, B256};

/// Wrapped ether, the quote asset every tracked pair is measured against
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// Uniswap V2 factory
pub const UNISWAP_V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");

/// keccak256 of the Uniswap V2 pair creation code
pub const UNISWAP_V2_INIT_CODE_HASH: B256 =
    b256!("96e8ac4277198ff8b6f785478aa9a39f403cb768dd02cbee326c3e7da348845f");

/// Zero address: source of mints, sink of burns
pub const BURN_ADDRESS: Address = Address::ZERO;

/// Conventional dead wallet used for irrevocable LP burns
pub const DEAD_ADDRESS: Address = address!("000000000000000000000000000000000000dEaD");

/// TeamFinance token locker
pub const TEAM_FINANCE_LOCKER: Address = address!("E2fE530C047f2d85298b07D9333C05737f1435fB");

/// Unicrypt Uniswap V2 locker
pub const UNICRYPT_LOCKER: Address = address!("663A5C229c09b049E36dCc11a9B0d4a8Eb9db214");

/// PinkSale PinkLock
pub const PINKLOCK_LOCKER: Address = address!("71B5759d73262FBb223956913ecF4ecC51057641");

/// topic0 of PinkLock's `LockAdded` event
pub const PINKLOCK_LOCK_ADDED_TOPIC: B256 =
    b256!("694af1cc8727cdd0afbdd53d9b87b69248bd490224e9dd090e788546506e076f");

/// BananaGun router
pub const BANANA_GUN_ROUTER: Address = address!("3328F7f4A1D1C57c35df56bBf0c9dCAFCA309C49");

/// Uniswap V2 Router02
pub const UNISWAP_V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

/// Maestro router
pub const MAESTRO_ROUTER: Address = address!("80a64c6D7f12C47B7c66c5B4E20E72bc1FCd5d9e");

/// Unlock time recorded for liquidity sent to a dead address
pub const PERMANENT_UNLOCK_TIME: u64 = u64::MAX;

/// Blocks per day at 12s slots
pub const BLOCKS_PER_DAY: u64 = 7200;

/// Default historical window replayed when no checkpoint exists (15 days)
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = BLOCKS_PER_DAY * 15;

/// True for either address liquidity can be irrevocably sent to
pub fn is_dead_address(address: &Address) -> bool {
    *address == BURN_ADDRESS || *address == DEAD_ADDRESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_addresses() {
        assert!(is_dead_address(&BURN_ADDRESS));
        assert!(is_dead_address(&DEAD_ADDRESS));
        assert!(!is_dead_address(&WETH));
    }

    #[test]
    fn test_lookback_window() {
        assert_eq!(DEFAULT_LOOKBACK_BLOCKS, 108_000);
    }
}
