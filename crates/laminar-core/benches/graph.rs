use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use laminar_core::distance::Euclidean;
use laminar_core::{HnswParams, Index};

fn random_vector(dim: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
    (0..dim)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64 / u64::MAX as f64) * 2.0 - 1.0
        })
        .collect()
}

fn build_index(dim: usize, count: u64) -> Index<Euclidean> {
    let index = Index::new(dim, HnswParams::auto(dim)).expect("valid params");
    for id in 0..count {
        index.insert(id, random_vector(dim, id)).expect("insert");
    }
    index
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for count in [100u64, 1_000] {
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |bencher, &count| {
            bencher.iter(|| black_box(build_index(32, count)));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for count in [1_000u64, 10_000] {
        let index = build_index(32, count);
        let query = random_vector(32, count + 1);
        group.bench_with_input(BenchmarkId::new("k10", count), &count, |bencher, _| {
            bencher.iter(|| black_box(index.search(black_box(&query), 10)));
        });
    }
    group.finish();
}

fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_insert");
    for count in [1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |bencher, &count| {
            bencher.iter(|| {
                let index: Index<Euclidean> = Index::new(32, HnswParams::auto(32)).expect("valid params");
                let items: Vec<(u64, Vec<f64>)> = (0..count).map(|id| (id, random_vector(32, id))).collect();
                black_box(index.batch_insert(items))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_batch_insert);
criterion_main!(benches);
