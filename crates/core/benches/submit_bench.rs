//! Submission throughput benchmarks for settle-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use settle_core::{Coalescer, DebounceConfig, Debouncer, KeyedDebouncer};
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build tokio runtime")
}

fn bench_debouncer(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("debouncer_submit_burst_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let debouncer = Debouncer::new(Duration::ZERO);
                let mut last = None;
                for i in 0..100u32 {
                    last = Some(debouncer.submit_sync(move || i));
                }
                if let Some(last) = last {
                    black_box(last.await.ok());
                }
            })
        });
    });

    c.bench_function("debouncer_flush_single", |b| {
        b.iter(|| {
            rt.block_on(async {
                let debouncer = Debouncer::new(Duration::from_secs(60));
                let pending = debouncer.submit(|| async { 42u64 });
                debouncer.flush();
                black_box(pending.await.ok());
            })
        });
    });
}

fn bench_keyed(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("keyed_submit_1k_keys", |b| {
        b.iter(|| {
            rt.block_on(async {
                let keyed: KeyedDebouncer<u32, u32> =
                    KeyedDebouncer::new(DebounceConfig::new(Duration::from_secs(60)));
                for key in 0..1_000u32 {
                    black_box(keyed.submit_sync(key, move || key));
                }
                keyed.cancel_all();
            })
        });
    });
}

fn bench_coalescer(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("coalescer_push_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let coalescer = Coalescer::new(&DebounceConfig::new(Duration::ZERO));
                let mut last = None;
                for i in 0..1_000u32 {
                    last = Some(coalescer.push(i));
                }
                if let Some(last) = last {
                    black_box(last.await.ok());
                }
            })
        });
    });
}

criterion_group!(benches, bench_debouncer, bench_keyed, bench_coalescer);
criterion_main!(benches);
