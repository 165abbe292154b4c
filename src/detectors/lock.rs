//! Liquidity and token locks.
//!
//! A transaction sent to one of the known locker contracts is read through
//! that protocol's deposit event. A transaction sent to a tracked pair that
//! moves LP tokens to a dead address counts as a permanent liquidity lock.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::info;

use super::{ClassifyError, TxContext};
use crate::constants::{is_dead_address, PERMANENT_UNLOCK_TIME, PINKLOCK_LOCKER, TEAM_FINANCE_LOCKER, UNICRYPT_LOCKER};
use crate::decoder::{timestamp_u64, DecodedEvent, DecodedLog};
use crate::ledger::LedgerTx;
use crate::notify::Topic;

/// Supported locker contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockProtocol {
    TeamFinance,
    Unicrypt,
    PinkLock,
}

impl LockProtocol {
    pub fn address(&self) -> Address {
        match self {
            LockProtocol::TeamFinance => TEAM_FINANCE_LOCKER,
            LockProtocol::Unicrypt => UNICRYPT_LOCKER,
            LockProtocol::PinkLock => PINKLOCK_LOCKER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LockProtocol::TeamFinance => "TeamFinance",
            LockProtocol::Unicrypt => "Unicrypt",
            LockProtocol::PinkLock => "PinkLock",
        }
    }

    /// Lock described by a log this protocol emits
    fn lock_from(&self, event: &DecodedEvent) -> Option<LockDeposit> {
        match (self, event) {
            (LockProtocol::TeamFinance, DecodedEvent::TeamFinanceDeposit { token, amount, unlock_time, .. }) => {
                Some(LockDeposit::new(*token, *amount, timestamp_u64(*unlock_time)))
            }
            (LockProtocol::Unicrypt, DecodedEvent::UnicryptDeposit { lp_token, amount, unlock_date, .. }) => {
                Some(LockDeposit::new(*lp_token, *amount, timestamp_u64(*unlock_date)))
            }
            (LockProtocol::PinkLock, DecodedEvent::PinkLockAdded { token, amount, unlock_date, .. }) => {
                Some(LockDeposit::new(*token, *amount, timestamp_u64(*unlock_date)))
            }
            _ => None,
        }
    }
}

static LOCK_PROTOCOLS: LazyLock<HashMap<Address, LockProtocol>> = LazyLock::new(|| {
    [LockProtocol::TeamFinance, LockProtocol::Unicrypt, LockProtocol::PinkLock]
        .into_iter()
        .map(|protocol| (protocol.address(), protocol))
        .collect()
});

pub fn lock_protocol(address: &Address) -> Option<LockProtocol> {
    LOCK_PROTOCOLS.get(address).copied()
}

/// Locked asset, amount and unlock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockDeposit {
    /// A pair address for LP locks, a token address otherwise
    pub asset: Address,
    pub amount: U256,
    pub unlock_time: u64,
}

impl LockDeposit {
    pub fn new(asset: Address, amount: U256, unlock_time: u64) -> Self {
        Self { asset, amount, unlock_time }
    }
}

/// First deposit event emitted by the protocol's own contract
pub fn protocol_deposit(protocol: LockProtocol, logs: &[DecodedLog]) -> Option<LockDeposit> {
    logs.iter()
        .filter(|log| log.address == protocol.address())
        .find_map(|log| protocol.lock_from(&log.event))
}

/// First LP transfer from `pair` to a dead address
pub fn dead_transfer(pair: Address, logs: &[DecodedLog]) -> Option<LockDeposit> {
    logs.iter().find_map(|log| match log.event {
        DecodedEvent::Transfer { to, value, .. } if log.address == pair && is_dead_address(&to) => {
            Some(LockDeposit::new(pair, value, PERMANENT_UNLOCK_TIME))
        }
        _ => None,
    })
}

pub async fn detect(ctx: &TxContext<'_>, logs: &[DecodedLog], ledger: &mut LedgerTx<'_>) -> Result<(), ClassifyError> {
    let Some(to) = ctx.receipt.to else {
        return Ok(());
    };
    let hash = ctx.tx.hash;

    let Some(protocol) = lock_protocol(&to) else {
        let Some(deposit) = dead_transfer(to, logs) else {
            return Ok(());
        };
        if let Some(mut record) = ledger.token_by_pair(to).await? {
            record.liquidity_locked_amount = Some(deposit.amount);
            record.liquidity_unlock_time = Some(deposit.unlock_time);
            record.liquidity_locked_hash = Some(hash);
            record.liquidity_locked_buy_count = Some(record.buy_count);
            record.liquidity_locked_sell_count = Some(record.sell_count);
            info!(token = %format!("{:#x}", record.address), amount = %deposit.amount, "lp sent to dead address");
            ledger.save(record, Some(Topic::LpLocked));
        }
        return Ok(());
    };

    let Some(deposit) = protocol_deposit(protocol, logs) else {
        return Ok(());
    };

    if let Some(mut record) = ledger.token_by_pair(deposit.asset).await? {
        record.liquidity_locked_amount = Some(deposit.amount);
        record.liquidity_unlock_time = Some(deposit.unlock_time);
        record.liquidity_locked_hash = Some(hash);
        record.liquidity_locked_buy_count = Some(record.buy_count);
        record.liquidity_locked_sell_count = Some(record.sell_count);
        info!(
            token = %format!("{:#x}", record.address),
            protocol = protocol.name(),
            unlock = deposit.unlock_time,
            "lp locked"
        );
        ledger.save(record, Some(Topic::LpLocked));
    }

    if let Some(mut record) = ledger.token_by_address(deposit.asset).await? {
        record.token_locked_amount = Some(deposit.amount);
        record.token_unlock_time = Some(deposit.unlock_time);
        record.token_locked_hash = Some(hash);
        info!(
            token = %format!("{:#x}", record.address),
            protocol = protocol.name(),
            unlock = deposit.unlock_time,
            "token locked"
        );
        ledger.save(record, Some(Topic::TokenLocked));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainTransaction, TxReceipt};
    use crate::constants::{DEAD_ADDRESS, WETH};
    use crate::notify::MockNotifier;
    use crate::store::{MemoryStore, TokenStore};
    use crate::types::{TokenRecord, TxPosition};
    use alloy::primitives::{address, B256};

    const TOKEN: Address = address!("00000000000000000000000000000000000000a1");
    const PAIR: Address = address!("00000000000000000000000000000000000000b1");
    const USER: Address = address!("00000000000000000000000000000000000000c1");

    fn store_with_token() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_token(TokenRecord {
            pair: Some(PAIR),
            pair_token: Some(WETH),
            buy_count: 7,
            sell_count: 2,
            ..TokenRecord::new(TOKEN)
        });
        store
    }

    fn sent_to(to: Address) -> (ChainTransaction, TxReceipt) {
        let tx = ChainTransaction {
            hash: B256::with_last_byte(0x33),
            from: USER,
            to: Some(to),
            ..Default::default()
        };
        let receipt = TxReceipt {
            transaction_hash: tx.hash,
            status: true,
            to: Some(to),
            ..Default::default()
        };
        (tx, receipt)
    }

    async fn run(store: &MemoryStore, to: Address, logs: &[DecodedLog], expected: &[Topic]) {
        let (tx, receipt) = sent_to(to);
        let ctx = TxContext::new(TxPosition::new(10, 0), &tx, &receipt);
        let mut ledger = LedgerTx::new(store, ctx.position);
        detect(&ctx, logs, &mut ledger).await.unwrap();

        let mut notifier = MockNotifier::new();
        for topic in expected.iter().copied() {
            notifier
                .expect_publish()
                .withf(move |n| n.topic == topic)
                .times(1)
                .return_const(());
        }
        ledger.commit(&notifier).await.unwrap();
    }

    // ==================== protocol table tests ====================

    #[test]
    fn test_protocol_lookup() {
        assert_eq!(lock_protocol(&TEAM_FINANCE_LOCKER), Some(LockProtocol::TeamFinance));
        assert_eq!(lock_protocol(&UNICRYPT_LOCKER), Some(LockProtocol::Unicrypt));
        assert_eq!(lock_protocol(&PINKLOCK_LOCKER), Some(LockProtocol::PinkLock));
        assert_eq!(lock_protocol(&PAIR), None);
    }

    #[test]
    fn test_deposit_must_come_from_locker() {
        let forged = DecodedLog {
            address: USER,
            event: DecodedEvent::UnicryptDeposit {
                lp_token: PAIR,
                user: USER,
                amount: U256::from(1),
                unlock_date: U256::from(1),
            },
        };
        assert_eq!(protocol_deposit(LockProtocol::Unicrypt, &[forged]), None);
    }

    // ==================== detect tests ====================

    #[tokio::test]
    async fn test_unicrypt_lp_lock() {
        let store = store_with_token();
        let logs = vec![DecodedLog {
            address: UNICRYPT_LOCKER,
            event: DecodedEvent::UnicryptDeposit {
                lp_token: PAIR,
                user: USER,
                amount: U256::from(900),
                unlock_date: U256::from(1_900_000_000u64),
            },
        }];
        run(&store, UNICRYPT_LOCKER, &logs, &[Topic::LpLocked]).await;

        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.liquidity_locked_amount, Some(U256::from(900)));
        assert_eq!(record.liquidity_unlock_time, Some(1_900_000_000));
        assert_eq!(record.liquidity_locked_hash, Some(B256::with_last_byte(0x33)));
        assert_eq!(record.liquidity_locked_buy_count, Some(7));
        assert_eq!(record.liquidity_locked_sell_count, Some(2));
        assert!(record.token_locked_amount.is_none());
    }

    #[tokio::test]
    async fn test_team_finance_token_lock() {
        let store = store_with_token();
        let logs = vec![DecodedLog {
            address: TEAM_FINANCE_LOCKER,
            event: DecodedEvent::TeamFinanceDeposit {
                token: TOKEN,
                withdrawal: USER,
                amount: U256::from(55),
                unlock_time: U256::from(1_800_000_000u64),
            },
        }];
        run(&store, TEAM_FINANCE_LOCKER, &logs, &[Topic::TokenLocked]).await;

        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.token_locked_amount, Some(U256::from(55)));
        assert_eq!(record.token_unlock_time, Some(1_800_000_000));
        assert!(record.liquidity_locked_amount.is_none());
    }

    #[tokio::test]
    async fn test_pinklock_lp_lock() {
        let store = store_with_token();
        let logs = vec![DecodedLog {
            address: PINKLOCK_LOCKER,
            event: DecodedEvent::PinkLockAdded {
                token: PAIR,
                owner: USER,
                amount: U256::from(1_250),
                unlock_date: U256::from(1_950_000_000u64),
            },
        }];
        run(&store, PINKLOCK_LOCKER, &logs, &[Topic::LpLocked]).await;

        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.liquidity_locked_amount, Some(U256::from(1_250)));
        assert_eq!(record.liquidity_unlock_time, Some(1_950_000_000));
        assert_eq!(record.liquidity_locked_hash, Some(B256::with_last_byte(0x33)));
        assert_eq!(record.liquidity_locked_buy_count, Some(7));
        assert_eq!(record.liquidity_locked_sell_count, Some(2));
        assert!(record.token_locked_amount.is_none());
    }

    #[test]
    fn test_pinklock_ignores_other_protocol_events() {
        let log = DecodedLog {
            address: PINKLOCK_LOCKER,
            event: DecodedEvent::UnicryptDeposit {
                lp_token: PAIR,
                user: USER,
                amount: U256::from(1),
                unlock_date: U256::from(1),
            },
        };
        assert_eq!(protocol_deposit(LockProtocol::PinkLock, &[log]), None);
    }

    #[tokio::test]
    async fn test_dead_transfer_is_permanent_lock() {
        let store = store_with_token();
        let logs = vec![DecodedLog {
            address: PAIR,
            event: DecodedEvent::Transfer {
                from: USER,
                to: DEAD_ADDRESS,
                value: U256::from(42),
            },
        }];
        run(&store, PAIR, &logs, &[Topic::LpLocked]).await;

        let record = store.token_by_address(TOKEN).await.unwrap().unwrap();
        assert_eq!(record.liquidity_locked_amount, Some(U256::from(42)));
        assert_eq!(record.liquidity_unlock_time, Some(PERMANENT_UNLOCK_TIME));
    }

    #[tokio::test]
    async fn test_transfer_to_live_address_is_not_a_lock() {
        let store = store_with_token();
        let logs = vec![DecodedLog {
            address: PAIR,
            event: DecodedEvent::Transfer {
                from: USER,
                to: USER,
                value: U256::from(42),
            },
        }];
        run(&store, PAIR, &logs, &[]).await;
        assert!(store.token_by_address(TOKEN).await.unwrap().unwrap().liquidity_locked_amount.is_none());
    }
}
