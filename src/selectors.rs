//! Governance Method Selectors
//!
//! Identifies owner-only token calls (limit removal, ownership changes) by
//! the 4-byte selector of the transaction input.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::decoder::extract_method_id;

/// Owner calls the classifier records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GovernanceMethod {
    /// removeLimits - 0x751039fc
    RemoveLimits,
    /// removeLimits (alternate build) - 0x62256589
    RemoveLimitsAlt,
    /// setMaxWalletSize - 0xea1644d5
    SetMaxWalletSize,
    /// setMaxTxnAmount - 0x74010ece
    SetMaxTxnAmount,
    /// changeMaxWalletAmount - 0x81bfdcca
    ChangeMaxWalletAmount,
    /// changeMaxTxAmount - 0x677daa57
    ChangeMaxTxAmount,
    /// setMaxTxAmount - 0xec28438a
    SetMaxTxAmount,
    /// maxLimits - 0x4019cfa9
    MaxLimits,
    /// renounceOwnership - 0x715018a6
    RenounceOwnership,
    /// transferOwnership - 0xf2fde38b
    TransferOwnership,
}

/// What a governance call does to the token record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernanceAction {
    RemoveLimits,
    SetMaxWallet,
    SetMaxTx,
    Renounce,
    TransferOwnership,
}

impl GovernanceAction {
    pub fn is_ownership(&self) -> bool {
        matches!(self, GovernanceAction::Renounce | GovernanceAction::TransferOwnership)
    }
}

impl GovernanceMethod {
    /// Returns the 4-byte method selector
    pub fn selector(&self) -> [u8; 4] {
        match self {
            GovernanceMethod::RemoveLimits => [0x75, 0x10, 0x39, 0xfc],
            GovernanceMethod::RemoveLimitsAlt => [0x62, 0x25, 0x65, 0x89],
            GovernanceMethod::SetMaxWalletSize => [0xea, 0x16, 0x44, 0xd5],
            GovernanceMethod::SetMaxTxnAmount => [0x74, 0x01, 0x0e, 0xce],
            GovernanceMethod::ChangeMaxWalletAmount => [0x81, 0xbf, 0xdc, 0xca],
            GovernanceMethod::ChangeMaxTxAmount => [0x67, 0x7d, 0xaa, 0x57],
            GovernanceMethod::SetMaxTxAmount => [0xec, 0x28, 0x43, 0x8a],
            GovernanceMethod::MaxLimits => [0x40, 0x19, 0xcf, 0xa9],
            GovernanceMethod::RenounceOwnership => [0x71, 0x50, 0x18, 0xa6],
            GovernanceMethod::TransferOwnership => [0xf2, 0xfd, 0xe3, 0x8b],
        }
    }

    /// Returns the human-readable method name
    pub fn name(&self) -> &'static str {
        match self {
            GovernanceMethod::RemoveLimits | GovernanceMethod::RemoveLimitsAlt => "removeLimits",
            GovernanceMethod::SetMaxWalletSize => "setMaxWalletSize",
            GovernanceMethod::SetMaxTxnAmount => "setMaxTxnAmount",
            GovernanceMethod::ChangeMaxWalletAmount => "changeMaxWalletAmount",
            GovernanceMethod::ChangeMaxTxAmount => "changeMaxTxAmount",
            GovernanceMethod::SetMaxTxAmount => "setMaxTxAmount",
            GovernanceMethod::MaxLimits => "maxLimits",
            GovernanceMethod::RenounceOwnership => "renounceOwnership",
            GovernanceMethod::TransferOwnership => "transferOwnership",
        }
    }

    /// Returns the hex-encoded method ID with 0x prefix
    pub fn hex(&self) -> String {
        format!("0x{}", hex::encode(self.selector()))
    }

    pub fn action(&self) -> GovernanceAction {
        match self {
            GovernanceMethod::RemoveLimits
            | GovernanceMethod::RemoveLimitsAlt
            | GovernanceMethod::MaxLimits => GovernanceAction::RemoveLimits,
            GovernanceMethod::SetMaxWalletSize | GovernanceMethod::ChangeMaxWalletAmount => {
                GovernanceAction::SetMaxWallet
            }
            GovernanceMethod::SetMaxTxnAmount
            | GovernanceMethod::ChangeMaxTxAmount
            | GovernanceMethod::SetMaxTxAmount => GovernanceAction::SetMaxTx,
            GovernanceMethod::RenounceOwnership => GovernanceAction::Renounce,
            GovernanceMethod::TransferOwnership => GovernanceAction::TransferOwnership,
        }
    }
}

const ALL_METHODS: [GovernanceMethod; 10] = [
    GovernanceMethod::RemoveLimits,
    GovernanceMethod::RemoveLimitsAlt,
    GovernanceMethod::SetMaxWalletSize,
    GovernanceMethod::SetMaxTxnAmount,
    GovernanceMethod::ChangeMaxWalletAmount,
    GovernanceMethod::ChangeMaxTxAmount,
    GovernanceMethod::SetMaxTxAmount,
    GovernanceMethod::MaxLimits,
    GovernanceMethod::RenounceOwnership,
    GovernanceMethod::TransferOwnership,
];

/// Static lookup table for method IDs
static GOVERNANCE_METHODS: LazyLock<HashMap<[u8; 4], GovernanceMethod>> =
    LazyLock::new(|| ALL_METHODS.into_iter().map(|m| (m.selector(), m)).collect());

/// Get the governance method for a given selector, if it matches
///
/// # Arguments
/// * `method_id` - The first 4 bytes of the transaction input data
///
/// # Returns
/// `Some(GovernanceMethod)` if this is a known governance call, `None` otherwise
pub fn get_governance_method(method_id: &[u8; 4]) -> Option<GovernanceMethod> {
    GOVERNANCE_METHODS.get(method_id).copied()
}

/// Classify transaction input by selector
pub fn match_input(input: &[u8]) -> Option<GovernanceMethod> {
    extract_method_id(input).and_then(|id| get_governance_method(&id))
}
