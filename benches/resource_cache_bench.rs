use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use resource_cache::{CacheConfig, ManualClock, ResourceCache};
use std::convert::Infallible;
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn load(k: &String) -> Result<u64, Infallible> {
    Ok(k.len() as u64)
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("resource_cache_get_hit", |b| {
        let mut cache: ResourceCache<String, _> = ResourceCache::new(CacheConfig::default(), load);
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        // Keep every entry live so hits never touch the free order.
        let _held: Vec<_> = keys.iter().map(|k| cache.get(k).unwrap()).collect();
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(cache.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("resource_cache_get_miss_10k", |b| {
        b.iter_batched(
            || -> ResourceCache<String, _, _> {
                ResourceCache::with_clock(
                    CacheConfig::new(Duration::from_millis(100)).with_capacity(10_000),
                    load,
                    ManualClock::new(),
                )
            },
            |mut cache| {
                let mut refs = Vec::with_capacity(10_000);
                for x in lcg(1).take(10_000) {
                    refs.push(cache.get(&key(x)).unwrap());
                }
                black_box((cache, refs))
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_park_unpark(c: &mut Criterion) {
    c.bench_function("resource_cache_park_unpark", |b| {
        let mut cache: ResourceCache<String, _> = ResourceCache::new(CacheConfig::default(), load);
        let k = "mesh".to_string();
        b.iter(|| {
            // Each round parks the entry on drop and unparks it on the next get.
            let h = cache.get(&k).unwrap();
            black_box(&h);
            drop(h);
        })
    });
}

fn bench_sweep(c: &mut Criterion) {
    c.bench_function("resource_cache_sweep_10k_parked", |b| {
        b.iter_batched(
            || {
                let clock = ManualClock::new();
                let mut cache: ResourceCache<String, _, _> = ResourceCache::with_clock(
                    CacheConfig::new(Duration::from_millis(100)),
                    load,
                    clock.clone(),
                );
                for x in lcg(3).take(10_000) {
                    drop(cache.get(&key(x)).unwrap());
                }
                clock.advance(Duration::from_millis(100));
                cache
            },
            |mut cache| black_box(cache.sweep()),
            BatchSize::SmallInput,
        )
    });
}

fn bench_clone_drop_handles(c: &mut Criterion) {
    c.bench_function("resource_cache_clone_drop_handle", |b| {
        let mut cache: ResourceCache<String, _> = ResourceCache::new(CacheConfig::default(), load);
        let h = cache.get("key").unwrap();
        b.iter(|| {
            let x = h.clone();
            black_box(&x);
            drop(x);
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_get_hit, bench_get_miss, bench_park_unpark, bench_sweep, bench_clone_drop_handles
}
criterion_main!(benches);
