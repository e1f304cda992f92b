//! Error types for shapealign

use thiserror::Error;

/// Main error type for shapealign operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("mesh collection is empty")]
    EmptyCollection,

    #[error("mesh {index} has {found} vertices, expected {expected}")]
    VertexCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("shape has no vertices")]
    EmptyShape,

    #[error("SVD computation failed during transform estimation")]
    SvdFailed,

    #[error("Degenerate point configuration: {0}")]
    Degenerate(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for shapealign operations
pub type Result<T> = std::result::Result<T, Error>;
