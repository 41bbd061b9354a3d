//! Approximate nearest neighbor index (HNSW).
//!
//! - [`config`] - Index configuration parameters
//! - [`graph`] - Arena graph storage and the persistence export view
//! - [`hnsw`] - The index itself: build, search, export/import
//! - [`visited`] - O(1)-reset visited set used as search scratch

pub mod config;
pub mod graph;
pub mod hnsw;
pub mod visited;

pub use config::HnswConfig;
pub use graph::{ExportNode, GraphExport};
pub use hnsw::{HnswIndex, SearchResult};
pub use visited::VisitedSet;
