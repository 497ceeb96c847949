//! Error types for index construction, mutation, and persistence.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes surfaced by the public API.
///
/// Usage errors (dimension mismatch, a missing distance function on load)
/// are detected and returned here rather than left as undefined behavior,
/// since bounds-checking a slice length is cheap relative to a graph
/// traversal.
#[derive(Debug, Error)]
pub enum Error {
    /// A vector's length did not match the index's configured dimension.
    #[error("vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        /// Dimension carried by the offending vector.
        actual: usize,
        /// Dimension the index was constructed with.
        expected: usize,
    },

    /// An id was inserted that already exists in the index.
    #[error("id {0} already exists in the index")]
    DuplicateId(u64),

    /// A construction parameter was out of range (e.g. `M == 0`).
    #[error("invalid parameter: {0}")]
    InvalidArgument(String),

    /// Underlying filesystem failure during `save`/`load`.
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// Which persistence operation failed.
        operation: &'static str,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot's header, version, or record shape did not match what
    /// the loader expected.
    #[error("failed to decode snapshot: {0}")]
    Decode(String),
}
