//! Error types for hierarchy generation

use thiserror::Error;

/// Main error type for the crate
///
/// Every variant except `Config` and `Io` is a contract violation: the caller
/// issued a request the hierarchy cannot honor and retrying will not help.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid {level} settings: {reason}")]
    InvalidSettings { level: String, reason: String },

    #[error("{child} is already registered under {parent}")]
    DuplicateRegistration { parent: String, child: String },

    #[error("Parent field of {0} is not generated")]
    ParentNotGenerated(String),

    #[error("Density fields of {0} were already generated")]
    AlreadyGenerated(String),

    #[error("Missing node: {0}")]
    MissingNode(String),

    #[error("Scale mismatch: expected {expected}, got {actual}")]
    ScaleMismatch { expected: String, actual: String },

    #[error("{0} lies outside the universe")]
    OutOfBounds(String),

    #[error("Kernel error: {0}")]
    Kernel(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
