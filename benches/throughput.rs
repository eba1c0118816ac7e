//! Throughput Benchmark for memline
//!
//! This benchmark measures the performance of the shared store
//! under various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use memline::storage::Store;
use std::sync::Arc;
use std::time::Duration;

/// Benchmark insert operations
fn bench_insert(c: &mut Criterion) {
    let store = Arc::new(Store::with_capacity(usize::MAX));

    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i);
            store.insert(&key, "small_value").unwrap();
            i += 1;
        });
    });

    group.bench_function("insert_medium", |b| {
        let mut i = 0u64;
        let value = "x".repeat(1024); // 1KB value
        b.iter(|| {
            let key = format!("key:{}", i);
            store.insert(&key, &value).unwrap();
            i += 1;
        });
    });

    group.bench_function("overwrite", |b| {
        store.insert("hot", "value").unwrap();
        b.iter(|| {
            store.insert("hot", "value").unwrap();
        });
    });

    group.finish();
}

/// Benchmark lookup operations
fn bench_lookup(c: &mut Criterion) {
    let store = Arc::new(Store::with_capacity(usize::MAX));

    // Pre-populate with data
    for i in 0..100_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        store.insert(&key, &value).unwrap();
    }

    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lookup_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.lookup(&[key.as_str()]));
            i += 1;
        });
    });

    group.bench_function("lookup_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(store.lookup(&[key.as_str()]));
            i += 1;
        });
    });

    group.bench_function("lookup_multi_key", |b| {
        b.iter(|| {
            black_box(store.lookup(&["key:1", "key:2", "key:3", "missing"]));
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let store = Arc::new(Store::with_capacity(usize::MAX));

    // Pre-populate
    for i in 0..10_000 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        store.insert(&key, &value).unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                let key = format!("new:{}", i);
                store.insert(&key, "value").unwrap();
            } else {
                // 80% reads
                let key = format!("key:{}", i % 10_000);
                black_box(store.lookup(&[key.as_str()]));
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access through the shared mutex
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(Store::with_capacity(usize::MAX));
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.insert(&key, "value").unwrap();
                            store.lookup(&[key.as_str()]);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_mixed, bench_concurrent);

criterion_main!(benches);
