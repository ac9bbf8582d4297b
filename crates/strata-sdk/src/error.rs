use strata_pull::{PullError, PullErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("repository not initialized at {0}")]
    NotInitialized(String),

    #[error("remote not found: {0}")]
    RemoteNotFound(String),

    #[error("remote already exists: {0}")]
    RemoteExists(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] strata_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] strata_refs::RefError),

    #[error(transparent)]
    Pull(#[from] PullError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// Classification of the underlying pull failure, if this is one.
    pub fn pull_kind(&self) -> Option<PullErrorKind> {
        match self {
            SdkError::Pull(e) => Some(e.kind()),
            _ => None,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
