//! Insertion throughput and construction cost, the same two measurements
//! the teacher crate's nightly `#[bench]` harness covered, ported to
//! `criterion` since `#![feature(test)]` doesn't build on stable.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cuckoofilter_rs::funnel::U64Funnel;
use cuckoofilter_rs::CuckooFilterBuilder;

fn bench_construction(c: &mut Criterion) {
    c.bench_function("construct_1m_capacity", |b| {
        b.iter(|| {
            CuckooFilterBuilder::new()
                .capacity(black_box(1_000_000))
                .target_fpr(black_box(0.01))
                .funnel(U64Funnel)
                .rng_seed(1)
                .build()
                .unwrap()
        });
    });
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_1m_elements", |b| {
        b.iter(|| {
            let mut filter = CuckooFilterBuilder::new()
                .capacity(1_000_000)
                .target_fpr(0.01)
                .funnel(U64Funnel)
                .rng_seed(2)
                .build()
                .unwrap();
            for i in 0u64..1_000_000 {
                black_box(filter.insert(&i));
            }
        });
    });
}

fn bench_contains(c: &mut Criterion) {
    let mut filter = CuckooFilterBuilder::new()
        .capacity(1_000_000)
        .target_fpr(0.01)
        .funnel(U64Funnel)
        .rng_seed(3)
        .build()
        .unwrap();
    for i in 0u64..1_000_000 {
        filter.insert(&i);
    }

    c.bench_function("contains_hit", |b| {
        b.iter(|| black_box(filter.contains(black_box(&500_000u64))));
    });
    c.bench_function("contains_miss", |b| {
        b.iter(|| black_box(filter.contains(black_box(&2_000_000u64))));
    });
}

criterion_group!(benches, bench_construction, bench_insert, bench_contains);
criterion_main!(benches);
