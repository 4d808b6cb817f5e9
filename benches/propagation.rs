//! Criterion benchmarks for the propagation pipeline
//!
//! Covers the host-side stages every engine pays for (flatten, pool
//! classification) and the full host-engine fixpoint at several scales.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use hyperprop::gpu::ExecutionPools;
use hyperprop::storage::{generate_planted, random_labels};
use hyperprop::{host_propagate, Hypergraph, PoolThresholds, PropagationOptions};

fn make_hypergraph(num_vertices: usize, num_edges: usize) -> Hypergraph {
    let mut hg = generate_planted(num_vertices, num_edges, 8, 0.85, 2, 6, 42).unwrap();
    let labels = random_labels(num_vertices, 8, 7).unwrap();
    hg.set_labels(labels).unwrap();
    hg
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");

    for size in [1_000, 10_000] {
        let hg = make_hypergraph(size, size * 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &hg, |b, hg| {
            b.iter(|| black_box(hg.flatten()));
        });
    }
    group.finish();
}

fn bench_pool_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_classification");

    for size in [1_000, 10_000] {
        let hg = make_hypergraph(size, size * 4);
        let csr = hg.flatten();
        group.bench_with_input(BenchmarkId::from_parameter(size), &csr, |b, csr| {
            b.iter(|| black_box(ExecutionPools::classify(csr, &PoolThresholds::default())));
        });
    }
    group.finish();
}

fn bench_host_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_propagation");
    group.sample_size(20);

    let options = PropagationOptions {
        max_iterations: 20,
        tolerance: 1e-6,
        max_labels: 8,
        ..PropagationOptions::default()
    };

    for size in [1_000, 10_000] {
        let hg = make_hypergraph(size, size * 4);
        group.bench_with_input(BenchmarkId::from_parameter(size), &hg, |b, hg| {
            b.iter(|| {
                let mut run = hg.clone();
                host_propagate(&mut run, &options).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_flatten,
    bench_pool_classification,
    bench_host_propagation
);
criterion_main!(benches);
