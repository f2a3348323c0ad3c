//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum GradVarError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Mismatch between the expected and the given shape of an array.
    #[error("Shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: String,
        /// Expected shape.
        expected: Vec<usize>,
        /// Given shape.
        actual: Vec<usize>,
    },

    /// A path is longer than the processor allows.
    #[error("Path of length {0} exceeds max_path_length {1}")]
    PathTooLong(usize, usize),

    /// A task index out of the meta-batch.
    #[error("Task index {0} is out of the meta-batch of size {1}")]
    TaskIndex(usize, usize),

    /// Invalid configuration of a component.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
