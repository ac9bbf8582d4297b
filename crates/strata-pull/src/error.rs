//! Error taxonomy for pulls.
//!
//! Every component fails fast with one of these and the orchestrator
//! surfaces it unchanged. Only [`PullError::Transport`] is ever retried, and
//! only by [`RetryingTransport`](crate::transport::RetryingTransport).

use strata_refs::RefError;
use strata_store::{ObjectKind, StoreError};
use strata_types::ObjectId;
use thiserror::Error;

/// Errors from the local repository while staging or committing.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Objects(#[from] StoreError),

    #[error(transparent)]
    Refs(#[from] RefError),
}

#[derive(Debug, Error)]
pub enum PullError {
    /// A requested ref is not advertised by the remote.
    #[error("ref {name} not found on remote {remote}")]
    RefNotFound { remote: String, name: String },

    /// The remote is unreachable or returned something malformed.
    #[error("transport error from {remote}: {reason}")]
    Transport { remote: String, reason: String },

    /// Fetched bytes do not hash to the checksum they were requested under.
    #[error("checksum mismatch for {kind} {expected}: computed {computed}")]
    ChecksumMismatch {
        kind: ObjectKind,
        expected: ObjectId,
        computed: ObjectId,
    },

    /// A content object was rejected by the file-mode policy.
    #[error("content object {id} rejected (mode {mode:o}): {reason}")]
    PermissionPolicy { id: ObjectId, mode: u32, reason: String },

    /// The local repository failed to stage or commit.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The pull request itself is malformed.
    #[error("invalid pull request: {0}")]
    InvalidRequest(String),

    /// The pull was cancelled before it committed.
    #[error("pull cancelled")]
    Cancelled,
}

/// Coarse classification of a [`PullError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PullErrorKind {
    RefNotFound,
    Transport,
    ChecksumMismatch,
    PermissionPolicy,
    Storage,
    InvalidRequest,
    Cancelled,
}

impl PullError {
    pub fn transport(remote: impl Into<String>, reason: impl Into<String>) -> Self {
        PullError::Transport {
            remote: remote.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> PullErrorKind {
        match self {
            PullError::RefNotFound { .. } => PullErrorKind::RefNotFound,
            PullError::Transport { .. } => PullErrorKind::Transport,
            PullError::ChecksumMismatch { .. } => PullErrorKind::ChecksumMismatch,
            PullError::PermissionPolicy { .. } => PullErrorKind::PermissionPolicy,
            PullError::Storage(_) => PullErrorKind::Storage,
            PullError::InvalidRequest(_) => PullErrorKind::InvalidRequest,
            PullError::Cancelled => PullErrorKind::Cancelled,
        }
    }

    /// Transient transport failures may succeed on retry; nothing else will.
    pub fn is_retryable(&self) -> bool {
        self.kind() == PullErrorKind::Transport
    }
}

impl From<StoreError> for PullError {
    fn from(e: StoreError) -> Self {
        PullError::Storage(StorageError::Objects(e))
    }
}

impl From<RefError> for PullError {
    fn from(e: RefError) -> Self {
        PullError::Storage(StorageError::Refs(e))
    }
}

pub type PullResult<T> = Result<T, PullError>;
