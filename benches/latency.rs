//! Latency benchmarks for the per-transaction hot path
//!
//! What every transaction pays before commit: log decoding and selector
//! matching. Plus the sniper summary the analytics commands run per token.

use alloy::primitives::{address, Address, B256, U256};
use alloy::sol_types::SolEvent;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use txnscope_indexer::abi::{IERC20, IUniswapV2Pair};
use txnscope_indexer::constants::{BANANA_GUN_ROUTER, MAESTRO_ROUTER};
use txnscope_indexer::heuristics::summarize;
use txnscope_indexer::selectors::match_input;
use txnscope_indexer::store::LedgerBatch;
use txnscope_indexer::types::Counterparty;
use txnscope_indexer::{
    decode_logs, LedgerStore, MemoryStore, Notification, RawLog, SniperThresholds, SniperTx, TokenRecord,
    Topic,
};

const PAIR: Address = address!("00000000000000000000000000000000000000b1");
const TOKEN: Address = address!("f0000000000000000000000000000000000000a1");

fn raw_log<E: SolEvent>(address: Address, event: &E) -> RawLog {
    let data = event.encode_log_data();
    RawLog {
        address,
        topics: data.topics().to_vec(),
        data: data.data.clone(),
    }
}

fn swap_receipt_logs() -> Vec<RawLog> {
    let trader = address!("00000000000000000000000000000000000000c1");
    vec![
        raw_log(
            TOKEN,
            &IERC20::Transfer {
                from: PAIR,
                to: trader,
                value: U256::from(1_000u64),
            },
        ),
        raw_log(
            PAIR,
            &IUniswapV2Pair::Swap {
                sender: BANANA_GUN_ROUTER,
                amount0In: U256::from(1_000_000u64),
                amount1In: U256::ZERO,
                amount0Out: U256::ZERO,
                amount1Out: U256::from(1_000u64),
                to: trader,
            },
        ),
    ]
}

fn sniper_rows(count: u64) -> Vec<SniperTx> {
    (0..count)
        .map(|i| SniperTx {
            address: TOKEN,
            tx_hash: B256::from(U256::from(i)),
            from: Address::from_word(B256::from(U256::from(i + 1_000))),
            to: Counterparty::resolve(if i % 3 == 0 { MAESTRO_ROUTER } else { BANANA_GUN_ROUTER }),
            nonce: i % 4,
            priority_fee: U256::from(2_000_000_000u64 + i),
            gas_limit: 300_000,
            gas_used: 150_000,
            gas_fee: U256::from(3_000_000_000_000_000u64),
            value: U256::from(10u64).pow(U256::from(17)),
            block_number: 100,
            position: i,
        })
        .collect()
}

/// Benchmark receipt log decoding
fn bench_decode_logs(c: &mut Criterion) {
    let logs = swap_receipt_logs();

    c.bench_function("decode_receipt_logs", |b| {
        b.iter(|| black_box(decode_logs(black_box(&logs))))
    });
}

/// Benchmark governance selector matching
fn bench_match_input(c: &mut Criterion) {
    let mut input = vec![0x81, 0xbf, 0xdc, 0xca];
    input.extend_from_slice(&[0u8; 32]);

    c.bench_function("match_governance_input", |b| {
        b.iter(|| black_box(match_input(black_box(&input))))
    });
}

/// Benchmark the per-token sniper summary
fn bench_summarize(c: &mut Criterion) {
    let rows = sniper_rows(200);
    let thresholds = SniperThresholds::default();

    c.bench_function("summarize_200_snipers", |b| {
        b.iter(|| black_box(summarize(black_box(&rows), &thresholds)))
    });
}

/// Benchmark JSON notification formatting
fn bench_format_notification(c: &mut Criterion) {
    let notification = Notification {
        topic: Topic::SwapEnabled,
        record: TokenRecord {
            name: "Bench".to_string(),
            symbol: "BNC".to_string(),
            decimals: 18,
            pair: Some(PAIR),
            ..TokenRecord::new(TOKEN)
        },
        timestamp: 1703000000000,
    };

    c.bench_function("format_notification_json", |b| {
        b.iter(|| black_box(notification.to_json()))
    });
}

/// Benchmark an in-memory batch commit
fn bench_memory_commit(c: &mut Criterion) {
    let Ok(runtime) = tokio::runtime::Runtime::new() else {
        return;
    };
    let store = MemoryStore::new();
    let batch = LedgerBatch {
        tokens: vec![TokenRecord::new(TOKEN)],
        snipers: sniper_rows(4),
    };

    c.bench_function("memory_store_commit", |b| {
        b.to_async(&runtime).iter(|| async { black_box(store.commit(&batch).await) })
    });
}

criterion_group!(
    benches,
    bench_decode_logs,
    bench_match_input,
    bench_summarize,
    bench_format_notification,
    bench_memory_commit
);
criterion_main!(benches);
