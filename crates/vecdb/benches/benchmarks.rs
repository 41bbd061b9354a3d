//! VecDB benchmarks.
//!
//! Covers the distance kernels, HNSW construction and search, and the
//! exact-scan path used by filtered search.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vecdb::{brute_force_top_k, distance, HnswConfig, HnswIndex, Metric, VectorStore};

// ============================================================================
// Helper: Simple RNG for reproducible benchmarks
// ============================================================================

struct Rng {
    state: u64,
}

impl Rng {
    const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0
    }

    fn next_vec(&mut self, dim: usize) -> Vec<f32> {
        (0..dim).map(|_| self.next_f32()).collect()
    }
}

fn populated_store(n: usize, dim: usize) -> VectorStore {
    let mut rng = Rng::new(123);
    let mut store = VectorStore::new(dim).unwrap();
    for i in 0..n {
        store
            .upsert(&format!("id_{i}"), &rng.next_vec(dim), None)
            .unwrap();
    }
    store
}

fn built_index(store: &VectorStore, metric: Metric) -> HnswIndex {
    let mut index = HnswIndex::new(metric, HnswConfig::default());
    for i in 0..store.len() {
        index.insert(store, i);
    }
    index
}

fn bench_distance(c: &mut Criterion) {
    let mut rng = Rng::new(7);
    let a = rng.next_vec(128);
    let b = rng.next_vec(128);

    let mut group = c.benchmark_group("distance");
    group.bench_function("l2_sq_128", |bench| {
        bench.iter(|| distance::l2_sq(black_box(&a), black_box(&b)));
    });
    group.bench_function("cosine_128", |bench| {
        bench.iter(|| distance::cosine_distance(black_box(&a), black_box(&b)));
    });
    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let store = populated_store(1000, 32);

    c.bench_function("hnsw_build_1k_d32", |bench| {
        bench.iter(|| built_index(black_box(&store), Metric::L2));
    });
}

fn bench_search(c: &mut Criterion) {
    let store = populated_store(5000, 32);
    let index = built_index(&store, Metric::L2);
    let mut rng = Rng::new(99);
    let queries: Vec<Vec<f32>> = (0..64).map(|_| rng.next_vec(32)).collect();

    let mut group = c.benchmark_group("search_5k_d32");
    for ef in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::new("hnsw_ef", ef), &ef, |bench, &ef| {
            let mut i = 0;
            bench.iter(|| {
                let q = &queries[i % queries.len()];
                i += 1;
                index.search(black_box(&store), black_box(q), 10, ef).unwrap()
            });
        });
    }
    group.bench_function("brute_force", |bench| {
        let mut i = 0;
        bench.iter(|| {
            let q = &queries[i % queries.len()];
            i += 1;
            brute_force_top_k(black_box(&store), Metric::L2, black_box(q), 10)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_distance, bench_build, bench_search);
criterion_main!(benches);
