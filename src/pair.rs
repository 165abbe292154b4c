//! Uniswap V2 pair address derivation.

use alloy::primitives::{keccak256, Address, B256};

/// Order two tokens the way the factory does
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

/// CREATE2 address of the pair for `token_a`/`token_b` under `factory`
pub fn derive_pair_address(
    factory: Address,
    token_a: Address,
    token_b: Address,
    init_code_hash: B256,
) -> Address {
    let (token0, token1) = sort_tokens(token_a, token_b);
    let mut packed = [0u8; 40];
    packed[..20].copy_from_slice(token0.as_slice());
    packed[20..].copy_from_slice(token1.as_slice());
    let salt = keccak256(packed);
    factory.create2(salt, init_code_hash)
}
