//! HNSW index implementation.
//!
//! A multi-level proximity graph over store slots. Upper layers are sparse
//! and give fast long-range navigation; layer 0 is dense and gives precise
//! local search. Edges are slot indices into the [`VectorStore`]; liveness
//! is checked at traversal time, so tombstoned slots prune themselves from
//! every search without graph repair.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use crate::distance::{self, Metric};
use crate::error::{Result, VecdbError};
use crate::store::VectorStore;

use super::config::HnswConfig;
use super::graph::{Candidate, ExportNode, GraphExport, MaxCandidate, NodeLinks};
use super::visited::VisitedSet;

/// Result of a similarity search: a store slot index and its distance to
/// the query (lower is closer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub index: usize,
    pub distance: f32,
}

fn lcg_next(state: &mut u32) -> u32 {
    *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    *state
}

/// Uniform draw in [0, 1) from the top 24 bits of the LCG state.
fn lcg_uniform01(state: &mut u32) -> f32 {
    let x = lcg_next(state) >> 8;
    x as f32 / (1u32 << 24) as f32
}

/// HNSW (Hierarchical Navigable Small World) index.
///
/// The index does not own the vectors; every operation borrows the
/// [`VectorStore`] whose slot indices the graph edges reference. Level
/// sampling uses a fixed linear-congruential generator, so the same seed
/// and insertion order always reproduce the same graph.
pub struct HnswIndex {
    metric: Metric,
    params: HnswConfig,
    /// Arena of per-node neighbor lists, indexed by store slot.
    nodes: Vec<NodeLinks>,
    entry_point: usize,
    has_entry: bool,
    max_level: i32,
    /// `None` until the first insert (and again after an import), at which
    /// point it is seeded from `params.seed`.
    rng_state: Option<u32>,
    /// Per-search scratch. Concurrent searches through a shared reference
    /// serialize on this lock.
    scratch: Mutex<VisitedSet>,
}

impl HnswIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new(metric: Metric, params: HnswConfig) -> Self {
        Self {
            metric,
            params,
            nodes: Vec::new(),
            entry_point: 0,
            has_entry: false,
            max_level: -1,
            rng_state: None,
            scratch: Mutex::new(VisitedSet::new()),
        }
    }

    /// Whether the graph has no entry point (nothing inserted yet).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_entry
    }

    /// The current top layer of the graph, or -1 when empty.
    #[must_use]
    pub fn max_level(&self) -> i32 {
        self.max_level
    }

    /// The configuration this index was built with.
    #[must_use]
    pub fn params(&self) -> &HnswConfig {
        &self.params
    }

    #[inline]
    fn max_degree(&self, level: i32) -> usize {
        if level == 0 {
            self.params.m0
        } else {
            self.params.m
        }
    }

    #[inline]
    fn node_level(&self, index: usize) -> i32 {
        self.nodes.get(index).map_or(-1, NodeLinks::level)
    }

    fn ensure_node(&mut self, index: usize) {
        if index >= self.nodes.len() {
            self.nodes.resize_with(index + 1, NodeLinks::default);
        }
    }

    /// Sample a level for the next inserted node.
    ///
    /// Counts consecutive uniform draws below `exp(-1 / level_mult)`, so
    /// each extra level is geometrically less likely.
    fn random_level(&mut self) -> i32 {
        let state = self.rng_state.get_or_insert(self.params.seed);
        let p = (-1.0f32 / self.params.level_mult.max(1e-4)).exp();
        let mut level = 0i32;
        while lcg_uniform01(state) < p {
            level += 1;
            if level > 64 {
                break;
            }
        }
        level
    }

    /// Insert a store slot into the graph.
    ///
    /// Dead slots are ignored. The caller drives insertion in slot order
    /// when building from a store.
    pub fn insert(&mut self, store: &VectorStore, index: usize) {
        if !store.is_alive(index) {
            return;
        }

        self.ensure_node(index);
        let level = self.random_level();
        self.nodes[index]
            .links
            .resize(level as usize + 1, Vec::new());

        if !self.has_entry {
            self.entry_point = index;
            self.has_entry = true;
            self.max_level = level;
            return;
        }

        let Some(query) = store.vector(index) else {
            return;
        };

        // Descend through the layers above this node's level, refining the
        // entry point with a beam of 1. No edges are added here.
        let mut ep = self.entry_point;
        let mut l = self.max_level;
        while l > level {
            ep = self.greedy_descent(store, query, ep, l);
            l -= 1;
        }

        // Search-and-connect from min(level, max_level) down to layer 0.
        let mut l = level.min(self.max_level);
        while l >= 0 {
            let mut candidates =
                self.search_layer(store, query, ep, l, self.params.ef_construction);
            candidates.retain(|c| c.index != index);

            let cap = self.max_degree(l);
            let chosen = if self.params.use_diversity {
                select_diverse(store, self.metric, index, &candidates, cap)
            } else {
                select_simple(&candidates, cap)
            };

            for nb in chosen {
                self.ensure_node(nb);
                if self.node_level(nb) < l {
                    continue;
                }
                self.connect_bidirectional(store, index, nb, l);
            }

            // The next layer down starts from this layer's best candidate.
            if let Some(best) = candidates.first() {
                ep = best.index;
            }
            l -= 1;
        }

        if level > self.max_level {
            self.max_level = level;
            self.entry_point = index;
        }
    }

    /// Search for the approximate k nearest neighbors of `query`.
    ///
    /// Returns an empty result set when the graph is empty or `k` is 0. The
    /// effective beam at layer 0 is `max(ef_search, k)`.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::InvalidArgument`] if the query dimension does
    /// not match the store.
    pub fn search(
        &self,
        store: &VectorStore,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.len() != store.dim() {
            return Err(VecdbError::InvalidArgument(format!(
                "query dim mismatch: expected {}, got {}",
                store.dim(),
                query.len()
            )));
        }
        if !self.has_entry || k == 0 {
            return Ok(Vec::new());
        }

        let mut ep = self.entry_point;
        let mut level = self.max_level;
        while level > 0 {
            ep = self.greedy_descent(store, query, ep, level);
            level -= 1;
        }

        let ef = ef_search.max(k);
        let mut results = self.search_layer(store, query, ep, 0, ef);
        results.truncate(k);
        Ok(results)
    }

    /// Best-first bounded-beam search on a single level.
    ///
    /// Maintains a candidate min-heap (the frontier) and a bounded result
    /// max-heap of the best `ef` found so far; stops once the closest
    /// frontier node is worse than the worst kept result. Dead neighbors
    /// are skipped, as are nodes whose level is below `level` (reachable
    /// through edges followed during descent from layers above).
    fn search_layer(
        &self,
        store: &VectorStore,
        query: &[f32],
        entry: usize,
        level: i32,
        ef: usize,
    ) -> Vec<SearchResult> {
        if !self.has_entry || ef == 0 {
            return Vec::new();
        }
        if !store.is_alive(entry) {
            return Vec::new();
        }

        let dist_to = |idx: usize| -> f32 {
            store
                .vector(idx)
                .map_or(f32::INFINITY, |v| distance::distance(self.metric, query, v))
        };

        let mut visited = match self.scratch.lock() {
            Ok(guard) => guard,
            // start() below re-initializes the scratch, so a guard poisoned
            // by a panicked search is still usable.
            Err(poisoned) => poisoned.into_inner(),
        };
        visited.start(store.len());

        let entry_distance = dist_to(entry);
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        let mut results: BinaryHeap<MaxCandidate> = BinaryHeap::new();
        candidates.push(Candidate {
            index: entry,
            distance: entry_distance,
        });
        results.push(MaxCandidate(Candidate {
            index: entry,
            distance: entry_distance,
        }));
        visited.set(entry);

        while let Some(current) = candidates.pop() {
            let worst = results.peek().map_or(f32::INFINITY, |c| c.0.distance);
            if current.distance > worst {
                break;
            }
            if self.node_level(current.index) < level {
                continue;
            }

            for &nb in &self.nodes[current.index].links[level as usize] {
                if !store.is_alive(nb) {
                    continue;
                }
                if visited.test_and_set(nb) {
                    continue;
                }

                let d = dist_to(nb);
                let worst = results.peek().map_or(f32::INFINITY, |c| c.0.distance);
                if results.len() < ef {
                    candidates.push(Candidate {
                        index: nb,
                        distance: d,
                    });
                    results.push(MaxCandidate(Candidate {
                        index: nb,
                        distance: d,
                    }));
                } else if d < worst {
                    candidates.push(Candidate {
                        index: nb,
                        distance: d,
                    });
                    results.push(MaxCandidate(Candidate {
                        index: nb,
                        distance: d,
                    }));
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut out: Vec<SearchResult> = results
            .into_iter()
            .map(|c| SearchResult {
                index: c.0.index,
                distance: c.0.distance,
            })
            .collect();
        out.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });
        out
    }

    fn greedy_descent(&self, store: &VectorStore, query: &[f32], entry: usize, level: i32) -> usize {
        let results = self.search_layer(store, query, entry, level, 1);
        results.first().map_or(entry, |r| r.index)
    }

    /// Re-apply the selection policy to a node whose list grew past the cap.
    fn prune_neighbors(&mut self, store: &VectorStore, node: usize, level: i32) {
        if self.node_level(node) < level {
            return;
        }
        let cap = self.max_degree(level);
        if self.nodes[node].links[level as usize].len() <= cap {
            return;
        }
        let Some(base_vec) = store.vector(node) else {
            return;
        };

        let mut cand: Vec<SearchResult> = self.nodes[node].links[level as usize]
            .iter()
            .filter_map(|&nb| {
                store.vector(nb).map(|v| SearchResult {
                    index: nb,
                    distance: distance::distance(self.metric, base_vec, v),
                })
            })
            .collect();
        cand.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });

        let kept = if self.params.use_diversity {
            select_diverse(store, self.metric, node, &cand, cap)
        } else {
            select_simple(&cand, cap)
        };
        self.nodes[node].links[level as usize] = kept;
    }

    fn connect_bidirectional(&mut self, store: &VectorStore, a: usize, b: usize, level: i32) {
        if self.node_level(a) < level || self.node_level(b) < level {
            return;
        }
        self.nodes[a].links[level as usize].push(b);
        self.nodes[b].links[level as usize].push(a);
        self.prune_neighbors(store, a, level);
        self.prune_neighbors(store, b, level);
    }

    /// Export the graph structure for persistence.
    ///
    /// The export contains one node per store slot (level -1 for slots the
    /// graph never inserted) so that on-disk slot indices line up with the
    /// store files.
    #[must_use]
    pub fn export_graph(&self, store: &VectorStore) -> GraphExport {
        let n = store.len();
        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            match self.nodes.get(i) {
                Some(node) if !node.links.is_empty() => nodes.push(ExportNode {
                    level: node.level(),
                    links: node.links.clone(),
                }),
                _ => nodes.push(ExportNode::default()),
            }
        }
        GraphExport {
            entry_point: self.entry_point,
            has_entry: self.has_entry,
            max_level: self.max_level,
            nodes,
        }
    }

    /// Replace the graph structure with an imported one.
    ///
    /// The level-sampling generator is reset, so a later insert reseeds it.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::CorruptState`] if the node count does not
    /// match the store, or if a node's link-list count disagrees with its
    /// level.
    pub fn import_graph(&mut self, store: &VectorStore, export: GraphExport) -> Result<()> {
        if export.nodes.len() != store.len() {
            return Err(VecdbError::CorruptState(format!(
                "graph node count mismatch: graph has {}, store has {}",
                export.nodes.len(),
                store.len()
            )));
        }

        let mut nodes = Vec::with_capacity(export.nodes.len());
        for (i, node) in export.nodes.into_iter().enumerate() {
            if node.level < 0 {
                nodes.push(NodeLinks::default());
                continue;
            }
            if node.links.len() != node.level as usize + 1 {
                return Err(VecdbError::CorruptState(format!(
                    "link list count mismatch at node {i}: level {} with {} lists",
                    node.level,
                    node.links.len()
                )));
            }
            nodes.push(NodeLinks { links: node.links });
        }

        self.nodes = nodes;
        self.entry_point = export.entry_point;
        self.has_entry = export.has_entry;
        self.max_level = export.max_level;
        self.rng_state = None;
        Ok(())
    }
}

/// Nearest-first selection: the first `m` candidates in distance order.
fn select_simple(candidates: &[SearchResult], m: usize) -> Vec<usize> {
    candidates.iter().take(m).map(|c| c.index).collect()
}

/// Diversity selection: admit a candidate only if it is closer to the base
/// than to every already-selected neighbor, then top up with the remaining
/// nearest candidates if fewer than `m` were admitted.
fn select_diverse(
    store: &VectorStore,
    metric: Metric,
    base: usize,
    candidates: &[SearchResult],
    m: usize,
) -> Vec<usize> {
    let mut selected = Vec::with_capacity(m.min(candidates.len()));
    if store.vector(base).is_none() {
        return selected;
    }

    for cand in candidates {
        if selected.len() >= m {
            break;
        }
        if cand.index == base || !store.is_alive(cand.index) {
            continue;
        }
        let Some(cand_vec) = store.vector(cand.index) else {
            continue;
        };

        let to_base = cand.distance;
        let diverse = selected.iter().all(|&s| {
            store
                .vector(s)
                .map_or(true, |s_vec| distance::distance(metric, cand_vec, s_vec) >= to_base)
        });
        if diverse {
            selected.push(cand.index);
        }
    }

    if selected.len() < m {
        for cand in candidates {
            if selected.len() >= m {
                break;
            }
            if cand.index == base || !store.is_alive(cand.index) {
                continue;
            }
            if selected.contains(&cand.index) {
                continue;
            }
            selected.push(cand.index);
        }
    }

    selected
}
