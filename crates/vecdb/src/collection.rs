//! Collections: a vector store plus an optional HNSW index behind one
//! reader-writer lock, persisted to a directory of files.
//!
//! Any mutation drops the built index, so a reader observes either a graph
//! built by a later [`Collection::build_index`] or no graph at all; there
//! is no incremental index maintenance. Filtered search never consults the
//! graph - it is an exact scan over alive slots, correct with or without a
//! built index.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::codec::{self, Manifest, HNSW_FILE, MANIFEST_FILE};
use crate::distance::{self, Metric};
use crate::error::{Result, VecdbError};
use crate::index::graph::{Candidate, MaxCandidate};
use crate::index::{HnswConfig, HnswIndex, SearchResult};
use crate::metadata::Metadata;
use crate::store::VectorStore;

/// Settings for a new collection.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    pub dim: usize,
    pub metric: Metric,
    pub hnsw: HnswConfig,
}

impl CollectionOptions {
    /// Options for a collection of `dim`-dimensional vectors under L2 with
    /// default HNSW parameters.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            metric: Metric::L2,
            hnsw: HnswConfig::default(),
        }
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    #[must_use]
    pub fn with_hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.hnsw = hnsw;
        self
    }
}

/// An exact-match metadata predicate for filtered search.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

impl MetadataFilter {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// An empty filter matches everything and routes to the unfiltered path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

struct Inner {
    metric: Metric,
    hnsw_params: HnswConfig,
    store: VectorStore,
    index: Option<HnswIndex>,
}

/// A persistent collection of `(id, vector, metadata)` records.
pub struct Collection {
    dir: PathBuf,
    inner: RwLock<Inner>,
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(VecdbError::InvalidArgument(format!(
                "path exists but is not a directory: {}",
                dir.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

impl Collection {
    /// Create a collection directory and persist an empty store into it.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::InvalidArgument`] if the path exists and is
    /// not a directory or if `options.dim` is zero, [`VecdbError::Io`] on
    /// write failure.
    pub fn create(dir: impl AsRef<Path>, options: CollectionOptions) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        ensure_dir(&dir)?;
        let store = VectorStore::new(options.dim)?;
        let collection = Self {
            dir,
            inner: RwLock::new(Inner {
                metric: options.metric,
                hnsw_params: options.hnsw,
                store,
                index: None,
            }),
        };
        collection.save()?;
        info!(dir = %collection.dir.display(), dim = options.dim, "created collection");
        Ok(collection)
    }

    /// Open an existing collection directory.
    ///
    /// The graph is loaded iff `hnsw.bin` is present.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::NotFound`] if the directory has no manifest,
    /// [`VecdbError::CorruptState`] if the stored files disagree with each
    /// other, [`VecdbError::Io`] on read failure.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.join(MANIFEST_FILE).is_file() {
            return Err(VecdbError::NotFound(format!(
                "no manifest.json in {}",
                dir.display()
            )));
        }

        let manifest = codec::read_manifest(&dir)?;
        let metric = manifest.metric();
        let hnsw_params = manifest.hnsw_config();

        let mut store = VectorStore::new(manifest.dim)?;
        codec::load_store(&dir, &mut store)?;

        let index = if dir.join(HNSW_FILE).is_file() {
            let export = codec::load_graph(&dir, store.len())?;
            let mut index = HnswIndex::new(metric, hnsw_params.clone());
            index.import_graph(&store, export)?;
            Some(index)
        } else {
            None
        };

        info!(
            dir = %dir.display(),
            slots = store.len(),
            has_index = index.is_some(),
            "opened collection"
        );
        Ok(Self {
            dir,
            inner: RwLock::new(Inner {
                metric,
                hnsw_params,
                store,
                index,
            }),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| VecdbError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| VecdbError::LockPoisoned)
    }

    /// The collection directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fixed vector dimension.
    pub fn dim(&self) -> Result<usize> {
        Ok(self.read()?.store.dim())
    }

    /// The active distance metric.
    pub fn metric(&self) -> Result<Metric> {
        Ok(self.read()?.metric)
    }

    /// Number of slots, including tombstones.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.store.len())
    }

    /// Whether the collection has no slots at all.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.store.is_empty())
    }

    /// Number of alive records.
    pub fn alive_count(&self) -> Result<usize> {
        Ok(self.read()?.store.alive_count())
    }

    /// Whether an id exists and is alive.
    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.read()?.store.contains(id))
    }

    /// The id stored at a slot index.
    pub fn id_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.read()?.store.id_at(index).map(str::to_string))
    }

    /// The metadata map at a slot index.
    pub fn metadata_at(&self, index: usize) -> Result<Option<Metadata>> {
        Ok(self.read()?.store.metadata_at(index).cloned())
    }

    /// The metadata map of an alive id.
    pub fn metadata_of(&self, id: &str) -> Result<Option<Metadata>> {
        Ok(self.read()?.store.metadata_of(id).cloned())
    }

    /// The vector payload of an alive id.
    pub fn vector_of(&self, id: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.read()?.store.vector_of(id).map(<[f32]>::to_vec))
    }

    /// Whether a built index is present.
    pub fn has_index(&self) -> Result<bool> {
        Ok(self.read()?.index.is_some())
    }

    /// The HNSW parameters the next build will use.
    pub fn hnsw_params(&self) -> Result<HnswConfig> {
        Ok(self.read()?.hnsw_params.clone())
    }

    /// Insert or overwrite a vector, keeping any existing metadata.
    ///
    /// Drops the built index.
    pub fn upsert(&self, id: &str, vec: &[f32]) -> Result<usize> {
        self.upsert_inner(id, vec, None)
    }

    /// Insert or overwrite a vector together with its metadata.
    ///
    /// Drops the built index.
    pub fn upsert_with_metadata(&self, id: &str, vec: &[f32], meta: Metadata) -> Result<usize> {
        self.upsert_inner(id, vec, Some(meta))
    }

    fn upsert_inner(&self, id: &str, vec: &[f32], meta: Option<Metadata>) -> Result<usize> {
        let mut inner = self.write()?;
        let index = inner.store.upsert(id, vec, meta)?;
        // correctness-first: any mutation invalidates the index
        inner.index = None;
        Ok(index)
    }

    /// Tombstone an id. Returns `false` if unknown or already dead.
    ///
    /// Drops the built index when something was actually removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let mut inner = self.write()?;
        let removed = inner.store.remove(id);
        if removed {
            inner.index = None;
        }
        Ok(removed)
    }

    /// Switch the distance metric. Drops the built index.
    pub fn set_metric(&self, metric: Metric) -> Result<()> {
        let mut inner = self.write()?;
        inner.metric = metric;
        inner.index = None;
        Ok(())
    }

    /// Replace the HNSW parameters. Drops the built index.
    pub fn set_hnsw_params(&self, params: HnswConfig) -> Result<()> {
        let mut inner = self.write()?;
        inner.hnsw_params = params;
        inner.index = None;
        Ok(())
    }

    /// Build a fresh HNSW index over the current alive slots.
    ///
    /// Holds the exclusive lock for the whole build.
    pub fn build_index(&self) -> Result<()> {
        let mut guard = self.write()?;
        let inner = &mut *guard;

        let mut index = HnswIndex::new(inner.metric, inner.hnsw_params.clone());
        for i in 0..inner.store.len() {
            if inner.store.is_alive(i) {
                index.insert(&inner.store, i);
            }
        }
        debug!(
            slots = inner.store.len(),
            alive = inner.store.alive_count(),
            max_level = index.max_level(),
            "built hnsw index"
        );
        inner.index = Some(index);
        Ok(())
    }

    /// Approximate top-k search through the built index.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::NotReady`] without a built index, and
    /// [`VecdbError::InvalidArgument`] on a query dimension mismatch.
    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<SearchResult>> {
        let inner = self.read()?;
        Self::search_unfiltered(&inner, query, k, ef_search)
    }

    fn search_unfiltered(
        inner: &Inner,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.len() != inner.store.dim() {
            return Err(VecdbError::InvalidArgument(format!(
                "query dim mismatch: expected {}, got {}",
                inner.store.dim(),
                query.len()
            )));
        }
        let index = inner.index.as_ref().ok_or(VecdbError::NotReady)?;
        index.search(&inner.store, query, k, ef_search)
    }

    /// Exact top-k search over alive slots whose metadata contains the
    /// filter's key/value pair.
    ///
    /// Works with or without a built index; an empty filter routes to the
    /// unfiltered (index-backed) path.
    pub fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        let inner = self.read()?;
        if filter.is_empty() {
            return Self::search_unfiltered(&inner, query, k, ef_search);
        }
        if query.len() != inner.store.dim() {
            return Err(VecdbError::InvalidArgument(format!(
                "query dim mismatch: expected {}, got {}",
                inner.store.dim(),
                query.len()
            )));
        }

        let store = &inner.store;
        Ok(scan_top_k(store, inner.metric, query, k, |i| {
            store
                .metadata_at(i)
                .map_or(false, |m| m.get(&filter.key) == Some(&filter.value))
        }))
    }

    /// Persist manifest, store files, and the graph (if built) to the
    /// collection directory.
    ///
    /// Not atomic: an interrupted save can leave files that disagree, which
    /// a later [`Collection::open`] rejects as
    /// [`VecdbError::CorruptState`].
    pub fn save(&self) -> Result<()> {
        let inner = self.write()?;
        ensure_dir(&self.dir)?;

        let manifest = Manifest::new(inner.store.dim(), inner.metric, &inner.hnsw_params);
        codec::write_manifest(&self.dir, &manifest)?;
        codec::save_store(&self.dir, &inner.store)?;

        match &inner.index {
            Some(index) => codec::save_graph(&self.dir, &index.export_graph(&inner.store))?,
            None => {
                let stale = self.dir.join(HNSW_FILE);
                if stale.is_file() {
                    fs::remove_file(stale)?;
                }
            }
        }

        info!(dir = %self.dir.display(), slots = inner.store.len(), "saved collection");
        Ok(())
    }
}

/// Bounded max-heap scan: exact top-k over the alive slots accepted by
/// `pred`, sorted ascending by distance.
fn scan_top_k(
    store: &VectorStore,
    metric: Metric,
    query: &[f32],
    k: usize,
    pred: impl Fn(usize) -> bool,
) -> Vec<SearchResult> {
    if k == 0 {
        return Vec::new();
    }

    let mut heap: BinaryHeap<MaxCandidate> = BinaryHeap::new();
    for i in 0..store.len() {
        if !store.is_alive(i) || !pred(i) {
            continue;
        }
        let Some(v) = store.vector(i) else {
            continue;
        };
        let d = distance::distance(metric, query, v);

        if heap.len() < k {
            heap.push(MaxCandidate(Candidate {
                index: i,
                distance: d,
            }));
        } else if let Some(worst) = heap.peek() {
            if d < worst.0.distance {
                heap.pop();
                heap.push(MaxCandidate(Candidate {
                    index: i,
                    distance: d,
                }));
            }
        }
    }

    let mut out: Vec<SearchResult> = heap
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

/// Exact top-k over every alive slot. The brute-force oracle used by the
/// demo and by recall evaluation.
#[must_use]
pub fn brute_force_top_k(
    store: &VectorStore,
    metric: Metric,
    query: &[f32],
    k: usize,
) -> Vec<SearchResult> {
    scan_top_k(store, metric, query, k, |_| true)
}
