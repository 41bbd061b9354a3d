//! Recall and determinism tests for the HNSW index against a brute-force
//! oracle.

mod fixtures;

use std::collections::HashSet;

use fixtures::Rng;
use vecdb::{brute_force_top_k, HnswConfig, HnswIndex, Metric, VectorStore};

fn populated_store(rng: &mut Rng, n: usize, dim: usize) -> VectorStore {
    let mut store = VectorStore::new(dim).unwrap();
    for i in 0..n {
        store
            .upsert(&format!("id_{i}"), &rng.next_vec(dim), None)
            .unwrap();
    }
    store
}

fn build_index(store: &VectorStore, metric: Metric, params: HnswConfig) -> HnswIndex {
    let mut index = HnswIndex::new(metric, params);
    for i in 0..store.len() {
        index.insert(store, i);
    }
    index
}

#[test]
fn recall_at_10_beats_090() {
    let n = 2000;
    let dim = 16;
    let k = 10;
    let queries = 30;
    let ef_search = 200;

    let mut rng = Rng::new(123);
    let store = populated_store(&mut rng, n, dim);
    let params = HnswConfig::default()
        .with_m(16)
        .with_m0(32)
        .with_ef_construction(100);
    let index = build_index(&store, Metric::L2, params);

    let mut hits = 0usize;
    let mut total = 0usize;
    for _ in 0..queries {
        let q = rng.next_vec(dim);
        let truth: HashSet<usize> = brute_force_top_k(&store, Metric::L2, &q, k)
            .into_iter()
            .map(|r| r.index)
            .collect();
        let approx = index.search(&store, &q, k, ef_search).unwrap();

        hits += approx.iter().filter(|r| truth.contains(&r.index)).count();
        total += truth.len();
    }

    let recall = hits as f64 / total as f64;
    assert!(recall > 0.90, "recall@{k} too low: {recall:.3}");
}

#[test]
fn diversity_off_still_searches() {
    let mut rng = Rng::new(5);
    let store = populated_store(&mut rng, 300, 8);
    let index = build_index(
        &store,
        Metric::L2,
        HnswConfig::default().with_diversity(false),
    );

    let q = rng.next_vec(8);
    let truth = brute_force_top_k(&store, Metric::L2, &q, 1);
    let approx = index.search(&store, &q, 1, 100).unwrap();
    assert_eq!(approx[0].index, truth[0].index);
}

#[test]
fn cosine_recall_reasonable() {
    let mut rng = Rng::new(31);
    let store = populated_store(&mut rng, 500, 12);
    let index = build_index(&store, Metric::Cosine, HnswConfig::default());

    let mut hits = 0usize;
    let mut total = 0usize;
    for _ in 0..10 {
        let q = rng.next_vec(12);
        let truth: HashSet<usize> = brute_force_top_k(&store, Metric::Cosine, &q, 5)
            .into_iter()
            .map(|r| r.index)
            .collect();
        let approx = index.search(&store, &q, 5, 100).unwrap();
        hits += approx.iter().filter(|r| truth.contains(&r.index)).count();
        total += truth.len();
    }
    assert!(hits as f64 / total as f64 > 0.85);
}

#[test]
fn same_seed_and_order_reproduce_the_graph() {
    let mut rng = Rng::new(9);
    let store = populated_store(&mut rng, 200, 8);
    let params = HnswConfig::default().with_seed(4242);

    let a = build_index(&store, Metric::L2, params.clone());
    let b = build_index(&store, Metric::L2, params);

    assert_eq!(a.export_graph(&store), b.export_graph(&store));
}

#[test]
fn search_skips_tombstones_after_build() {
    let mut rng = Rng::new(77);
    let mut store = populated_store(&mut rng, 200, 8);
    let index = build_index(&store, Metric::L2, HnswConfig::default());

    // tombstone the best match, unless it is the entry point (a dead entry
    // empties every search by design)
    let entry = index.export_graph(&store).entry_point;
    let q = rng.next_vec(8);
    let top = index.search(&store, &q, 2, 100).unwrap();
    let victim = top.iter().find(|r| r.index != entry).unwrap().index;
    let victim_id = store.id_at(victim).unwrap().to_string();
    store.remove(&victim_id);

    let after = index.search(&store, &q, 10, 100).unwrap();
    assert!(after.iter().all(|r| r.index != victim));
}
