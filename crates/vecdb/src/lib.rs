//! `VecDB`
//!
//! An embeddable vector-search engine for fixed-dimension f32 vectors. A
//! [`Collection`] stores `(id, vector, metadata)` records in a tombstoned
//! stable-index [`VectorStore`], builds an HNSW proximity graph over them,
//! and answers approximate top-k nearest-neighbor queries under squared
//! Euclidean or cosine distance. Collections persist to a directory of
//! files and reload bit-exactly.
//!
//! # Example
//!
//! ```no_run
//! use vecdb::{Collection, CollectionOptions, Metric};
//!
//! # fn main() -> vecdb::Result<()> {
//! let collection = Collection::create(
//!     "data/demo",
//!     CollectionOptions::new(4).with_metric(Metric::L2),
//! )?;
//!
//! collection.upsert("u1", &[1.0, 0.0, 0.0, 0.0])?;
//! collection.upsert("u2", &[0.0, 1.0, 0.0, 0.0])?;
//! collection.build_index()?;
//!
//! let results = collection.search(&[0.9, 0.1, 0.0, 0.0], 2, 50)?;
//! assert_eq!(collection.id_at(results[0].index)?.as_deref(), Some("u1"));
//!
//! collection.save()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`collection`] - The orchestrating [`Collection`] and filtered search
//! - [`store`] - Stable-index tombstoned vector storage
//! - [`index`] - The HNSW graph: build, search, export/import
//! - [`distance`] - Distance kernels and the [`Metric`] tag
//! - [`codec`] - The on-disk directory format
//! - [`metadata`] - The `key=value;...` metadata line codec
//! - [`csv`] - CSV boundary adapter for loaders and the CLI
//! - [`error`] - The [`VecdbError`] taxonomy

pub mod codec;
pub mod collection;
pub mod csv;
pub mod distance;
pub mod error;
pub mod index;
pub mod metadata;
pub mod store;

// Re-export commonly used types
pub use collection::{brute_force_top_k, Collection, CollectionOptions, MetadataFilter};
pub use distance::Metric;
pub use error::{Result, VecdbError};
pub use index::{HnswConfig, HnswIndex, SearchResult};
pub use metadata::Metadata;
pub use store::VectorStore;
