//! Benchmarks to measure the compute overhead of recording into an `AllocationLedger`.
//!
//! The ledger sits on the measurement path of allocation instruments, so recording an
//! already seen allocation site must stay cheap regardless of stack depth.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use alloc_ledger::AllocationLedger;
use criterion::{Criterion, criterion_group, criterion_main};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const SHALLOW_LOCATION: &[&str] = &["bench::run", "worker::main"];

const DEEP_LOCATION: &[&str] = &[
    "tree::insert",
    "tree::insert",
    "tree::insert",
    "tree::insert",
    "tree::rebalance",
    "tree::rebalance",
    "bench::populate",
    "bench::run",
    "harness::invoke",
    "harness::measure",
    "worker::run_trial",
    "worker::main",
];

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_ledger_record");

    group.bench_function("known_site_shallow", |b| {
        let mut ledger = AllocationLedger::new();
        ledger.record("Vec<u8>", 64, SHALLOW_LOCATION);

        b.iter(|| {
            ledger.record(black_box("Vec<u8>"), black_box(64), SHALLOW_LOCATION);
        });
    });

    group.bench_function("known_site_deep", |b| {
        let mut ledger = AllocationLedger::new();
        ledger.record("Box<Node>", 48, DEEP_LOCATION);

        b.iter(|| {
            ledger.record(black_box("Box<Node>"), black_box(48), DEEP_LOCATION);
        });
    });

    group.bench_function("new_site_each_time", |b| {
        let mut ledger = AllocationLedger::new();
        let mut size = 0_u64;

        b.iter(|| {
            size = size.wrapping_add(1);
            ledger.record("Vec<u8>", black_box(size), SHALLOW_LOCATION);
        });
    });

    group.finish();

    let mut group = c.benchmark_group("alloc_ledger_total");

    group.bench_function("total_size_100_sites", |b| {
        let mut ledger = AllocationLedger::new();
        for size in 0..100 {
            for _ in 0..1000 {
                ledger.record("Vec<u8>", size, SHALLOW_LOCATION);
            }
        }

        b.iter(|| black_box(ledger.total_size()));
    });

    group.finish();
}
