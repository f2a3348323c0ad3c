//! Errors of the launcher.
use thiserror::Error;

/// Errors in a hyperparameter set.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    /// A mandatory hyperparameter is missing.
    #[error("Missing hyperparameter: {0}")]
    MissingParam(String),

    /// A hyperparameter has a value of an unexpected type.
    #[error("Hyperparameter {key} must be {expected}, got {actual}")]
    InvalidType {
        /// Name of the hyperparameter.
        key: String,
        /// Expected type.
        expected: &'static str,
        /// Given value.
        actual: String,
    },

    /// The algorithm tag is none of `DICE`, `VPG_DICE` and `VPG`.
    #[error("Unknown algorithm tag: {0}")]
    UnknownAlgo(String),

    /// A named reference does not resolve to a known component.
    #[error("Unknown reference in {key}: {path}")]
    UnknownRef {
        /// Name of the hyperparameter.
        key: String,
        /// Path of the reference.
        path: String,
    },

    /// A value has the right type but is out of range.
    #[error("Invalid value of {key}: {reason}")]
    InvalidValue {
        /// Name of the hyperparameter.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}
