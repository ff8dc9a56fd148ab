//! Search-mode benchmarks.
//!
//! Compares the three execution modes at matched parameters, and the cost of
//! tightening the rank guarantee (smaller tau, larger alpha) in dual mode.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rann::{Dataset, DistanceMetric, RaSearch, RaSearchConfig};

const N: usize = 10_000;
const DIM: usize = 16;
const NUM_QUERIES: usize = 100;
const K: usize = 5;

fn config(naive: bool, single_mode: bool, tau: f64, alpha: f64) -> RaSearchConfig {
    RaSearchConfig {
        naive,
        single_mode,
        tau,
        alpha,
        seed: Some(42),
        ..RaSearchConfig::default()
    }
}

fn bench_modes(c: &mut Criterion) {
    let reference = Dataset::random(N, DIM, 1);
    let queries = Dataset::random(NUM_QUERIES, DIM, 2);

    let mut group = c.benchmark_group("modes");
    for (name, naive, single_mode) in [
        ("naive", true, false),
        ("single", false, true),
        ("dual", false, false),
    ] {
        let engine: RaSearch =
            RaSearch::new(&reference, DistanceMetric::L2, config(naive, single_mode, 5.0, 0.95))
                .unwrap();
        group.bench_function(name, |b| {
            b.iter(|| black_box(engine.search(&queries, K).unwrap()))
        });
    }
    group.finish();
}

fn bench_guarantee_tightness(c: &mut Criterion) {
    let reference = Dataset::random(N, DIM, 3);
    let queries = Dataset::random(NUM_QUERIES, DIM, 4);

    let mut group = c.benchmark_group("dual_tau");
    for tau in [1.0, 5.0, 10.0, 25.0] {
        let engine: RaSearch =
            RaSearch::new(&reference, DistanceMetric::L2, config(false, false, tau, 0.95))
                .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(tau), &tau, |b, _| {
            b.iter(|| black_box(engine.search(&queries, K).unwrap()))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("dual_alpha");
    for alpha in [0.8, 0.9, 0.95, 0.99] {
        let engine: RaSearch =
            RaSearch::new(&reference, DistanceMetric::L2, config(false, false, 5.0, alpha))
                .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(alpha), &alpha, |b, _| {
            b.iter(|| black_box(engine.search(&queries, K).unwrap()))
        });
    }
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let reference = Dataset::random(N, DIM, 5);
    c.bench_function("engine_build", |b| {
        b.iter(|| {
            let engine: RaSearch = RaSearch::new(
                black_box(&reference),
                DistanceMetric::L2,
                config(false, false, 5.0, 0.95),
            )
            .unwrap();
            black_box(engine)
        })
    });
}

criterion_group!(benches, bench_modes, bench_guarantee_tightness, bench_build);
criterion_main!(benches);
