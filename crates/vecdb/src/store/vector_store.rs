//! Stable-index vector store implementation.

use std::collections::HashMap;

use crate::error::{Result, VecdbError};
use crate::metadata::Metadata;

/// Contiguous in-memory storage for fixed-dimension vectors.
///
/// Slot indices are dense integers in `[0, len())` and are stable for the
/// lifetime of the store: removal marks a slot dead but keeps its index, id
/// and bytes in place, and a later upsert of the same id revives the same
/// slot. This is what keeps HNSW neighbor lists (which store indices) valid
/// across deletions and restarts.
pub struct VectorStore {
    dim: usize,
    /// Flat row-major payload: slot `i` owns `data[i*dim .. (i+1)*dim]`.
    data: Vec<f32>,
    alive: Vec<bool>,
    ids: Vec<String>,
    meta: Vec<Metadata>,
    /// id -> slot index. Tombstoned ids stay mapped so they can be revived.
    id_to_index: HashMap<String, usize>,
}

impl VectorStore {
    /// Create an empty store for vectors of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::InvalidArgument`] if `dim` is zero.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(VecdbError::InvalidArgument("dim must be > 0".into()));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
            alive: Vec::new(),
            ids: Vec::new(),
            meta: Vec::new(),
            id_to_index: HashMap::new(),
        })
    }

    /// Fixed vector dimension for this store.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of slots, including dead ones. Indices range over `[0, len())`.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the store has no slots at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of alive (non-tombstoned) slots.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    /// True if the index exists and the slot is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, index: usize) -> bool {
        self.alive.get(index).copied().unwrap_or(false)
    }

    /// Whether an id exists and is alive.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_index
            .get(id)
            .is_some_and(|&idx| self.is_alive(idx))
    }

    /// The id stored at a slot. Dead slots keep their id.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// The slot index of an alive id.
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<usize> {
        let idx = *self.id_to_index.get(id)?;
        self.is_alive(idx).then_some(idx)
    }

    /// The vector payload at a slot.
    ///
    /// Returns `None` for out-of-range indices and dead slots.
    #[must_use]
    pub fn vector(&self, index: usize) -> Option<&[f32]> {
        if !self.is_alive(index) {
            return None;
        }
        Some(&self.data[index * self.dim..(index + 1) * self.dim])
    }

    /// The vector payload of an alive id.
    #[must_use]
    pub fn vector_of(&self, id: &str) -> Option<&[f32]> {
        self.vector(*self.id_to_index.get(id)?)
    }

    /// The metadata map at a slot (dead slots keep theirs).
    #[must_use]
    pub fn metadata_at(&self, index: usize) -> Option<&Metadata> {
        self.meta.get(index)
    }

    /// The metadata map of an alive id.
    #[must_use]
    pub fn metadata_of(&self, id: &str) -> Option<&Metadata> {
        self.metadata_at(self.index_of(id)?)
    }

    fn validate(&self, id: &str, vec: &[f32]) -> Result<()> {
        if id.is_empty() {
            return Err(VecdbError::InvalidArgument("id cannot be empty".into()));
        }
        if vec.len() != self.dim {
            return Err(VecdbError::InvalidArgument(format!(
                "vector dim mismatch: expected {}, got {}",
                self.dim,
                vec.len()
            )));
        }
        Ok(())
    }

    fn write_payload(&mut self, index: usize, vec: &[f32]) {
        self.data[index * self.dim..(index + 1) * self.dim].copy_from_slice(vec);
    }

    fn append_slot(&mut self, id: &str, vec: &[f32], meta: Metadata) -> usize {
        let index = self.ids.len();
        self.ids.push(id.to_string());
        self.alive.push(true);
        self.meta.push(meta);
        self.data.extend_from_slice(vec);
        self.id_to_index.insert(id.to_string(), index);
        index
    }

    /// Insert or overwrite a vector.
    ///
    /// An existing id (alive or tombstoned) keeps its slot index: the payload
    /// is overwritten, the slot is marked alive, and the metadata is replaced
    /// only when `meta` is provided. A new id appends a fresh slot.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::InvalidArgument`] for an empty id or a
    /// dimension mismatch.
    pub fn upsert(&mut self, id: &str, vec: &[f32], meta: Option<Metadata>) -> Result<usize> {
        self.validate(id, vec)?;

        if let Some(&index) = self.id_to_index.get(id) {
            self.write_payload(index, vec);
            self.alive[index] = true;
            if self.ids[index].is_empty() {
                self.ids[index] = id.to_string();
            }
            if let Some(m) = meta {
                self.meta[index] = m;
            }
            return Ok(index);
        }

        Ok(self.append_slot(id, vec, meta.unwrap_or_default()))
    }

    /// Insert a new vector, failing if the id is already alive.
    ///
    /// A tombstoned id is revived at its original slot index.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::Conflict`] if the id is alive, or
    /// [`VecdbError::InvalidArgument`] for an empty id or dimension mismatch.
    pub fn insert(&mut self, id: &str, vec: &[f32]) -> Result<usize> {
        self.validate(id, vec)?;

        if let Some(&index) = self.id_to_index.get(id) {
            if self.is_alive(index) {
                return Err(VecdbError::Conflict(format!("id already exists: {id}")));
            }
            // tombstoned: revive in place
            self.write_payload(index, vec);
            self.alive[index] = true;
            return Ok(index);
        }

        Ok(self.append_slot(id, vec, Metadata::default()))
    }

    /// Tombstone an id.
    ///
    /// Returns `false` if the id is unknown or already dead. The id string,
    /// payload bytes, metadata, and id mapping are all kept so a later
    /// upsert revives the same slot index.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(&index) = self.id_to_index.get(id) else {
            return false;
        };
        if !self.is_alive(index) {
            return false;
        }
        self.alive[index] = false;
        true
    }

    /// Drop all slots and mappings.
    pub fn clear(&mut self) {
        self.data.clear();
        self.alive.clear();
        self.ids.clear();
        self.meta.clear();
        self.id_to_index.clear();
    }

    /// Rebuild the store exactly as it existed on disk.
    ///
    /// Indices are preserved: `ids[i]`, `alive[i]` and `meta[i]` describe
    /// slot `i`, and `vectors` is the flat `n * dim` payload. The id mapping
    /// is rebuilt from every non-empty id, alive or not, so tombstones stay
    /// revivable after a reload.
    ///
    /// # Errors
    ///
    /// Returns [`VecdbError::CorruptState`] if the input lengths disagree.
    pub fn load_from_disk(
        &mut self,
        n: usize,
        vectors: Vec<f32>,
        alive: Vec<bool>,
        ids: Vec<String>,
        meta: Vec<Metadata>,
    ) -> Result<()> {
        if n == 0 {
            self.clear();
            return Ok(());
        }
        if alive.len() != n {
            return Err(VecdbError::CorruptState(format!(
                "alive length mismatch: expected {n}, got {}",
                alive.len()
            )));
        }
        if ids.len() != n {
            return Err(VecdbError::CorruptState(format!(
                "ids length mismatch: expected {n}, got {}",
                ids.len()
            )));
        }
        if meta.len() != n {
            return Err(VecdbError::CorruptState(format!(
                "metadata length mismatch: expected {n}, got {}",
                meta.len()
            )));
        }
        if vectors.len() != n * self.dim {
            return Err(VecdbError::CorruptState(format!(
                "vectors length mismatch: expected {}, got {}",
                n * self.dim,
                vectors.len()
            )));
        }

        self.data = vectors;
        self.alive = alive;
        self.ids = ids;
        self.meta = meta;

        self.id_to_index.clear();
        self.id_to_index.reserve(n);
        for (i, id) in self.ids.iter().enumerate() {
            if !id.is_empty() {
                self.id_to_index.insert(id.clone(), i);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_zero_dim_rejected() {
        assert!(matches!(
            VectorStore::new(0),
            Err(VecdbError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_upsert_and_read_back() {
        let mut store = VectorStore::new(2).unwrap();
        let i1 = store.upsert("u1", &[1.0, 2.0], None).unwrap();
        let i2 = store.upsert("u2", &[3.0, 4.0], None).unwrap();

        assert_eq!((i1, i2), (0, 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.vector_of("u1").unwrap(), &[1.0, 2.0]);
        assert_eq!(store.vector(1).unwrap(), &[3.0, 4.0]);
        assert_eq!(store.id_at(0), Some("u1"));
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut store = VectorStore::new(2).unwrap();
        store.upsert("u1", &[1.0, 2.0], None).unwrap();
        let idx = store.upsert("u1", &[9.0, 9.0], None).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.vector_of("u1").unwrap(), &[9.0, 9.0]);
    }

    #[test]
    fn test_upsert_keeps_metadata_unless_provided() {
        let mut store = VectorStore::new(2).unwrap();
        store
            .upsert("u1", &[1.0, 2.0], Some(meta(&[("lang", "en")])))
            .unwrap();
        store.upsert("u1", &[3.0, 4.0], None).unwrap();
        assert_eq!(store.metadata_of("u1"), Some(&meta(&[("lang", "en")])));

        store
            .upsert("u1", &[5.0, 6.0], Some(meta(&[("lang", "fr")])))
            .unwrap();
        assert_eq!(store.metadata_of("u1"), Some(&meta(&[("lang", "fr")])));
    }

    #[test]
    fn test_remove_tombstones() {
        let mut store = VectorStore::new(2).unwrap();
        let idx = store.upsert("u1", &[1.0, 2.0], None).unwrap();

        assert!(store.remove("u1"));
        assert!(!store.contains("u1"));
        assert!(!store.is_alive(idx));
        assert!(store.vector(idx).is_none());
        assert!(store.vector_of("u1").is_none());
        // slot and id survive
        assert_eq!(store.len(), 1);
        assert_eq!(store.id_at(idx), Some("u1"));

        assert!(!store.remove("u1"), "second remove is a no-op");
        assert!(!store.remove("unknown"));
    }

    #[test]
    fn test_tombstone_revival_keeps_index() {
        let mut store = VectorStore::new(2).unwrap();
        store.upsert("u1", &[1.0, 0.0], None).unwrap();
        store.upsert("u2", &[0.0, 1.0], None).unwrap();
        store.remove("u1");
        let idx = store.upsert("u1", &[5.0, 5.0], None).unwrap();

        assert_eq!(idx, 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.alive_count(), 2);
        assert_eq!(store.vector_of("u1").unwrap(), &[5.0, 5.0]);
    }

    #[test]
    fn test_insert_conflict_and_revive() {
        let mut store = VectorStore::new(2).unwrap();
        store.insert("u1", &[1.0, 2.0]).unwrap();
        assert!(matches!(
            store.insert("u1", &[1.0, 2.0]),
            Err(VecdbError::Conflict(_))
        ));

        store.remove("u1");
        let idx = store.insert("u1", &[7.0, 8.0]).unwrap();
        assert_eq!(idx, 0);
        assert!(store.is_alive(0));
    }

    #[test]
    fn test_validation() {
        let mut store = VectorStore::new(2).unwrap();
        assert!(matches!(
            store.upsert("", &[1.0, 2.0], None),
            Err(VecdbError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.upsert("u1", &[1.0], None),
            Err(VecdbError::InvalidArgument(_))
        ));
        // failed calls leave no partial state
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_load_from_disk_rebuilds_tombstones() {
        let mut store = VectorStore::new(2).unwrap();
        store
            .load_from_disk(
                3,
                vec![1.0, 0.0, 0.0, 1.0, 2.0, 2.0],
                vec![true, false, true],
                vec!["a".into(), "b".into(), "c".into()],
                vec![Metadata::new(), Metadata::new(), meta(&[("k", "v")])],
            )
            .unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.alive_count(), 2);
        assert!(!store.contains("b"));

        // the tombstoned id is still revivable at its old index
        let idx = store.upsert("b", &[9.0, 9.0], None).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(store.metadata_at(2), Some(&meta(&[("k", "v")])));
    }

    #[test]
    fn test_load_from_disk_length_mismatch() {
        let mut store = VectorStore::new(2).unwrap();
        let err = store
            .load_from_disk(
                2,
                vec![1.0, 0.0],
                vec![true, true],
                vec!["a".into(), "b".into()],
                vec![Metadata::new(), Metadata::new()],
            )
            .unwrap_err();
        assert!(matches!(err, VecdbError::CorruptState(_)));
    }
}
