//! Vector storage.
//!
//! [`VectorStore`] is a stable-index slot table: once a slot index is
//! assigned it never moves, deletion tombstones the slot instead of
//! compacting, and the HNSW graph's neighbor lists reference these indices
//! directly.

mod vector_store;

pub use vector_store::VectorStore;
