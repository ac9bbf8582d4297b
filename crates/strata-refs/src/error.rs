//! Error types for reference operations.

use strata_types::ObjectId;
use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The reference was not found.
    #[error("ref not found: {name}")]
    NotFound { name: String },

    /// The ref name is invalid.
    #[error("invalid ref name: {name}: {reason}")]
    InvalidRefName { name: String, reason: String },

    /// The remote name is invalid.
    #[error("invalid remote name: {name}: {reason}")]
    InvalidRemoteName { name: String, reason: String },

    /// A ref changed between reading it and updating it.
    #[error("ref {name} changed concurrently: expected {expected:?}, found {actual:?}")]
    Conflict {
        name: String,
        expected: Option<ObjectId>,
        actual: Option<ObjectId>,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error during file-based ref operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
