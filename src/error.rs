//! Error types for litevec.
//!
//! All fallible operations return [`Result`]. Recoverable caller mistakes
//! (shape and mode errors) and environment failures (I/O, corrupt snapshots)
//! share one [`Error`] enum so embedders match on a single type.

use std::io;

use thiserror::Error;

use crate::hnsw::DistanceMetric;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A vector's dimension does not match the database dimension.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the database was opened with.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// A mutating operation was attempted on a read-only database.
    #[error("database is open in read-only mode")]
    ReadOnly,

    /// Encoded data was requested but no scalar quantizer is attached.
    #[error("no scalar quantizer is attached")]
    NoQuantizer,

    /// The scalar quantizer was used before being trained.
    #[error("scalar quantizer is not trained")]
    UntrainedQuantizer,

    /// Scalar quantization only preserves squared-L2 semantics; other metrics
    /// are rejected rather than silently computing wrong distances.
    #[error("scalar quantization requires the L2 metric, got {0:?}")]
    QuantizerMetric(DistanceMetric),

    /// A snapshot's recorded parameters disagree with the open configuration.
    #[error("snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    /// A snapshot failed structural validation while being decoded.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// An underlying I/O failure during save or load.
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "vector dimension mismatch: expected 4, got 3"
        );
        assert_eq!(Error::ReadOnly.to_string(), "database is open in read-only mode");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
