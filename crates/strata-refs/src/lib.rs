//! Reference management for Strata.
//!
//! References are the human-readable entry points into the object graph:
//! named pointers to commits.
//!
//! # Architecture
//!
//! - **Branches** (`refs/heads/*`) are local refs. Mirror pulls write here.
//! - **Remote-tracking refs** (`refs/remotes/<remote>/*`) record what a
//!   remote advertised at the last pull.
//! - A [`Summary`] is the listing a repository serves to pullers.
//!
//! # Modules
//!
//! - [`error`]: error types for ref operations
//! - [`types`]: [`Ref`] and [`RefUpdate`]
//! - [`traits`]: the [`RefStore`] storage interface
//! - [`names`]: ref and remote name validation
//! - [`memory`] / [`fs`]: in-memory and `refs.json` backends
//! - [`lock`]: commit and file locks shared by repository writers

pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod names;
pub mod summary;
mod table;
pub mod traits;
pub mod types;

pub use error::{RefError, Result};
pub use fs::{FsRefStore, REFS_FILE};
pub use lock::{CommitGuard, CommitLock, FileLock, COMMIT_LOCK_FILE};
pub use memory::InMemoryRefStore;
pub use names::{validate_ref_name, validate_remote_name};
pub use summary::Summary;
pub use traits::RefStore;
pub use types::{Ref, RefUpdate, HEADS_PREFIX, REMOTES_PREFIX};
