//! Error types for the engine.

use thiserror::Error;

/// Errors that can occur in store, index, codec, and collection operations.
#[derive(Debug, Error)]
pub enum VecdbError {
    /// Malformed input: zero dimension, empty id, dimension mismatch,
    /// unparsable CSV, bad filter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `insert` of an id that is already alive.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unfiltered search without a built index.
    #[error("index not ready: call build_index() or open a collection with a saved index")]
    NotReady,

    /// Filesystem open/read/write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk state that cannot be loaded: magic mismatch, size
    /// disagreement between files, malformed metadata or graph.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// `open` on a directory that has no manifest.
    #[error("not found: {0}")]
    NotFound(String),

    /// A lock was poisoned by a panic in another thread.
    ///
    /// This error is unrecoverable - the collection must be dropped and
    /// reopened.
    #[error("collection corrupted: lock poisoned due to prior panic in another thread")]
    LockPoisoned,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, VecdbError>;
