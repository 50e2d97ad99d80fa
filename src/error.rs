//! Error types shared by every Spatial Pooler operation.
//!
//! Configuration errors surface from `initialize`, the accessors and `compute`.
//! Deserialization errors surface from `load` and `from_bytes`. Nothing is retried:
//! an error aborts the call and the instance may be left partially updated.

use thiserror::Error;

/// Everything that can go wrong while building, running or restoring a Spatial Pooler.
#[derive(Error, Debug)]
pub enum SpatialPoolerError {
    /// Input and column spaces must have the same number of dimensions.
    #[error("Dimension mismatch: input space has {input} dimensions, column space has {columns}")]
    DimensionMismatch { input: usize, columns: usize },

    /// Empty dimension list or a dimension of size zero.
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A parameter lies outside its valid range.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Global inhibition would select zero columns.
    #[error("Not enough columns ({num_columns}) for desired density ({density})")]
    NotEnoughColumns { num_columns: usize, density: f32 },

    /// The potential pool of a column cannot hold `threshold` connected synapses.
    #[error(
        "Stimulus threshold {threshold} is unreachable for column {column} with {potential} potential inputs"
    )]
    UnreachableStimulusThreshold {
        column: usize,
        threshold: u32,
        potential: usize,
    },

    /// A caller-owned buffer has the wrong length.
    #[error("Buffer length mismatch: expected {expected}, got {actual}")]
    InputLength { expected: usize, actual: usize },

    /// A per-column accessor was called with an index past the last column.
    #[error("Column {column} out of range (num columns: {num_columns})")]
    ColumnOutOfRange { column: usize, num_columns: usize },

    /// A serialized stream carries an unexpected start or end marker.
    #[error("Expected marker '{expected}', found '{found}'")]
    MarkerMismatch { expected: String, found: String },

    /// A serialized stream was written by a newer version of the format.
    #[error("Unsupported version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A token could not be parsed or is inconsistent with the rest of the stream.
    #[error("Malformed stream: {0}")]
    Malformed(String),

    /// The stream ended before all tokens were read.
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Result type alias using `SpatialPoolerError`.
pub type Result<T> = std::result::Result<T, SpatialPoolerError>;
