//! # Work-Stealing Deque Benchmark
//!
//! - Owner push/pop throughput with no thieves
//! - Steal throughput from a prefilled deque
//! - Mixed owner/thief contention
//!
//! Run with: `cargo bench --package phasefx_core --bench deque_benchmark`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use phasefx_core::WorkStealingDeque;
use std::thread;

/// Tasks moved through the deque per iteration.
const TASKS: usize = 100_000;

/// Benchmark: owner pushes then pops everything (LIFO, uncontended).
fn bench_owner_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("deque_owner");
    group.throughput(Throughput::Elements(TASKS as u64));

    group.bench_function("push_pop_100K", |b| {
        b.iter(|| {
            let deque = WorkStealingDeque::new();
            for task in 0..TASKS {
                deque.push_own(task);
            }
            let mut sum = 0usize;
            while let Some(task) = deque.pop_own() {
                sum += task;
            }
            black_box(sum)
        });
    });

    group.finish();
}

/// Benchmark: N thieves drain a prefilled deque (FIFO, contended head).
fn bench_steal_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("deque_steal");
    group.throughput(Throughput::Elements(TASKS as u64));

    for thieves in [1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(thieves), &thieves, |b, &thieves| {
            b.iter(|| {
                let deque = WorkStealingDeque::new();
                for task in 0..TASKS {
                    deque.push_own(task);
                }
                thread::scope(|s| {
                    for _ in 0..thieves {
                        let stealer = deque.stealer();
                        s.spawn(move || {
                            let mut count = 0usize;
                            while stealer.steal().is_some() {
                                count += 1;
                            }
                            black_box(count)
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

/// Benchmark: owner pops while thieves steal from the same deque.
fn bench_mixed_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("deque_mixed");
    group.throughput(Throughput::Elements(TASKS as u64));

    group.bench_function("owner_plus_3_thieves", |b| {
        b.iter(|| {
            let deque = WorkStealingDeque::new();
            for task in 0..TASKS {
                deque.push_own(task);
            }
            thread::scope(|s| {
                for _ in 0..3 {
                    let stealer = deque.stealer();
                    s.spawn(move || while stealer.steal().is_some() {});
                }
                while deque.pop_own().is_some() {}
            });
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_owner_push_pop,
    bench_steal_drain,
    bench_mixed_contention,
);
criterion_main!(benches);
