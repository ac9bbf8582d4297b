use strata_types::ObjectId;

use crate::object::ObjectKind;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("{kind} object not found: {id}")]
    NotFound { id: ObjectId, kind: ObjectKind },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression or decompression of a stored file object failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: ObjectId, reason: String },

    /// Attempted to write a null object ID.
    #[error("cannot store object with null ID")]
    NullObjectId,

    /// The directory is not an initialized repository.
    #[error("not a repository: {0}")]
    NotARepository(String),

    /// A decoded object exceeded the size limit for its kind.
    #[error("{kind} object larger than {limit} bytes")]
    ObjectTooLarge { kind: ObjectKind, limit: u64 },

    /// The staging area was used after it was discarded.
    #[error("staging area already discarded")]
    StagingClosed,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
