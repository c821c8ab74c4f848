use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

use sluice::{
    BucketAlgorithm, Capacity, LocalBucketOptions, LocalBucketRateLimiter, Rate, RateLimiter,
};

const ALGORITHMS: [BucketAlgorithm; 2] =
    [BucketAlgorithm::TokenBucket, BucketAlgorithm::LeakyBucket];

fn limiter(algorithm: BucketAlgorithm, capacity: f64, rate: Rate) -> LocalBucketRateLimiter {
    LocalBucketRateLimiter::new(
        algorithm,
        LocalBucketOptions::new(Capacity::try_from(capacity).unwrap(), rate),
    )
}

fn bench_hot_key_allowed(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_bucket/hot_key_allowed");
    group.sample_size(200);

    for algorithm in ALGORITHMS {
        group.bench_function(format!("allow_request/{algorithm}"), |b| {
            // Refills far faster than the loop can drain it.
            let limiter = limiter(algorithm, 1e9, Rate::try_from(1e9).unwrap());
            limiter.allow_request("k").unwrap();

            b.iter(|| {
                black_box(limiter.allow_request(black_box("k")).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_many_keys_allowed(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_bucket/many_keys_allowed");
    group.sample_size(100);

    for algorithm in ALGORITHMS {
        for key_space in [1_000_usize, 100_000] {
            group.bench_function(format!("allow_request/{algorithm}/keys={key_space}"), |b| {
                let limiter = limiter(algorithm, 1e9, Rate::try_from(1e9).unwrap());
                let keys: Vec<String> = (0..key_space).map(|i| format!("user_{i}")).collect();
                let mut idx = 0_usize;

                b.iter_batched(
                    || {
                        idx = idx.wrapping_add(1);
                        idx % keys.len()
                    },
                    |i| black_box(limiter.allow_request(black_box(&keys[i])).unwrap()),
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

fn bench_reject_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_bucket/reject_path");
    group.sample_size(200);

    for algorithm in ALGORITHMS {
        group.bench_function(format!("allow_request/{algorithm}/rejected"), |b| {
            let limiter = limiter(algorithm, 10.0, Rate::non_replenishing());
            for _ in 0..20 {
                let _ = limiter.allow_request("k");
            }

            b.iter(|| {
                black_box(limiter.allow_request(black_box("k")).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_cleanup(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_bucket/cleanup");
    group.sample_size(50);

    // Nothing has recovered yet, so this measures the full scan.
    group.bench_function("cleanup/keys=10000", |b| {
        b.iter_batched(
            || {
                let limiter =
                    limiter(BucketAlgorithm::TokenBucket, 10.0, Rate::try_from(1.0).unwrap());
                for i in 0..10_000 {
                    limiter.allow_request(&format!("user_{i}")).unwrap();
                }
                limiter
            },
            |limiter| black_box(limiter.cleanup()),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_hot_key_allowed,
    bench_many_keys_allowed,
    bench_reject_path,
    bench_cleanup
);
criterion_main!(benches);
