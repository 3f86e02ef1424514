use bucket_hashmap::{BucketHashMap, IdentityBuildHasher};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

const BUCKETS: usize = 4096;

type GuidMap = BucketHashMap<u64, u64, BUCKETS, IdentityBuildHasher>;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn filled(seed: u64, n: usize) -> (GuidMap, Vec<u64>) {
    let mut m = GuidMap::default();
    let keys: Vec<u64> = lcg(seed).take(n).collect();
    for (i, &k) in keys.iter().enumerate() {
        m.push(k, i as u64);
    }
    (m, keys)
}

fn bench_push_10k(c: &mut Criterion) {
    c.bench_function("bucket::push_10k", |b| {
        b.iter_batched(
            GuidMap::default,
            |mut m| {
                for (i, k) in lcg(1).take(10_000).enumerate() {
                    m.push(k, i as u64);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_peek_hit_10k(c: &mut Criterion) {
    c.bench_function("bucket::peek_hit_10k_on_10k", |b| {
        let (m, keys) = filled(7, 10_000);
        b.iter(|| {
            for k in &keys {
                black_box(m.peek(k));
            }
        })
    });
}

fn bench_peek_miss_10k(c: &mut Criterion) {
    c.bench_function("bucket::peek_miss_10k_on_10k", |b| {
        let (m, _) = filled(11, 10_000);
        let misses: Vec<u64> = lcg(0xdead_beef).take(10_000).collect();
        b.iter(|| {
            for k in &misses {
                black_box(m.peek(k));
            }
        })
    });
}

fn bench_position_reuse(c: &mut Criterion) {
    c.bench_function("bucket::value_at_10k", |b| {
        let (m, keys) = filled(13, 10_000);
        let positions: Vec<_> = keys.iter().filter_map(|k| m.index_of(k)).collect();
        b.iter(|| {
            for p in &positions {
                black_box(m.value_at(*p));
            }
        })
    });
}

fn bench_remove_via_position(c: &mut Criterion) {
    c.bench_function("bucket::index_of_then_remove_at_10k", |b| {
        b.iter_batched(
            || filled(17, 10_000),
            |(mut m, keys)| {
                for k in &keys {
                    if let Some(p) = m.index_of(k) {
                        black_box(m.remove_at(p));
                    }
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_export(c: &mut Criterion) {
    c.bench_function("bucket::collect_into_10k", |b| {
        let (m, _) = filled(19, 10_000);
        let mut values = Vec::new();
        let mut keys = Vec::new();
        b.iter(|| {
            m.collect_into(&mut values, &mut keys);
            black_box((&values, &keys));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(3))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_push_10k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_peek_hit_10k,
              bench_peek_miss_10k,
              bench_position_reuse,
              bench_remove_via_position,
              bench_export
}
criterion_main!(benches_insert, benches_ops);
