use bytes::Bytes;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use gale_protocol::Value;
use gale_storage::{Cache, LruCache};

fn bench_add_get_sequential(c: &mut Criterion) {
    c.bench_function("add_get_sequential_10k", |b| {
        b.iter(|| {
            let mut cache = LruCache::new(0);
            for i in 0..10_000 {
                let key = format!("key:{i}");
                let value = Value::new(u32::MAX, Bytes::from(format!("value:{i}")));
                cache.add(key.clone(), value);
                black_box(cache.get(&key));
            }
        })
    });
}

fn bench_eviction_churn(c: &mut Criterion) {
    c.bench_function("bounded_1k_insert_10k", |b| {
        b.iter(|| {
            let mut cache = LruCache::new(1_000);
            for i in 0..10_000 {
                cache.add(format!("key:{i}"), Value::new(u32::MAX, Bytes::from("v")));
            }
            black_box(cache.len())
        })
    });
}

fn bench_get_hot_key(c: &mut Criterion) {
    let mut cache = LruCache::new(0);
    for i in 0..1_000 {
        cache.add(format!("key:{i}"), Value::new(u32::MAX, Bytes::from("v")));
    }

    c.bench_function("get_hot_key", |b| {
        b.iter(|| black_box(cache.get("key:500")))
    });
}

fn bench_shared_cache_concurrent(c: &mut Criterion) {
    c.bench_function("shared_add_get_4_threads_10k", |b| {
        b.iter(|| {
            let cache = Cache::new(0);
            let mut handles = Vec::new();

            for t in 0..4 {
                let cache = cache.clone();
                handles.push(std::thread::spawn(move || {
                    for i in 0..2_500 {
                        let key = format!("t{t}:k{i}");
                        cache.add(key.clone(), Value::new(u32::MAX, Bytes::from("v")));
                        black_box(cache.get(&key));
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }
        })
    });
}

fn bench_keys_snapshot(c: &mut Criterion) {
    let cache = Cache::new(0);
    for i in 0..1_000 {
        cache.add(format!("key:{i}"), Value::new(u32::MAX, Bytes::from("v")));
    }

    c.bench_function("keys_snapshot_1k", |b| {
        b.iter(|| black_box(cache.keys()))
    });
}

criterion_group!(
    benches,
    bench_add_get_sequential,
    bench_eviction_churn,
    bench_get_hot_key,
    bench_shared_cache_concurrent,
    bench_keys_snapshot,
);
criterion_main!(benches);
