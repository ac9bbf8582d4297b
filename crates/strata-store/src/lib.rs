//! Content-addressed object storage for Strata.
//!
//! Every piece of repository content -- commits, directory trees, directory
//! metadata, file contents -- is stored as an immutable object identified by
//! its checksum (domain-separated by object kind).
//!
//! # Object Types
//!
//! - [`Commit`] -- a snapshot pointing at a root tree and root metadata
//! - [`DirTree`] -- directory listing of files and subdirectories
//! - [`DirMeta`] -- directory ownership, mode and xattrs
//! - [`FileObject`] -- file header plus content
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- loose objects on disk, layout in [`layout`]
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Transactions stage objects first and publish them before any ref moves.
//! 3. Concurrent reads are always safe (objects are immutable).
//! 4. Stores never verify checksums on read; verification is the puller's job.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod layout;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{
    Commit, DirMeta, DirTree, DirTreeDir, DirTreeFile, FileHeader, FileObject, FileType,
    ObjectKind, StoredObject, Xattr, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG,
};
pub use traits::{ObjectStore, StagingArea};
