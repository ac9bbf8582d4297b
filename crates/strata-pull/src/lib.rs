//! Pull engine for Strata.
//!
//! Replicates commits, directory trees, directory metadata and file content
//! from a remote repository into a local one:
//!
//! 1. [`resolver`] maps requested ref names to remote commits.
//! 2. [`fetcher`] walks each commit's object graph breadth-first and fetches
//!    what is missing locally through a [`RemoteTransport`].
//! 3. [`verifier`] checks checksums and the file-mode policy of every object.
//! 4. [`transaction`] stages objects and commits them together with the ref
//!    updates, or not at all.
//!
//! [`Puller`] drives the four for one [`PullRequest`].
//!
//! ```no_run
//! # async fn demo() -> strata_pull::PullResult<()> {
//! use std::sync::Arc;
//! use strata_pull::{transport::LocalTransport, PullOptions, PullRequest, Puller};
//! use strata_refs::FsRefStore;
//! use strata_store::FsObjectStore;
//!
//! let local = std::path::Path::new("/srv/repo");
//! let puller = Puller::new(
//!     Arc::new(FsObjectStore::open(local)?),
//!     Arc::new(FsRefStore::open(local)),
//! );
//! let remote = LocalTransport::open("/mnt/upstream")?;
//! let request = PullRequest::new("upstream", &["os/stable".to_string()], PullOptions::default());
//! let report = puller.pull(&remote, &request).await?;
//! println!("{} objects written", report.objects_written);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fetcher;
pub mod options;
pub mod orchestrator;
pub mod resolver;
pub mod transaction;
pub mod transport;
pub mod types;
pub mod verifier;

pub use error::{PullError, PullErrorKind, PullResult, StorageError};
pub use fetcher::ObjectFetcher;
pub use options::{ChecksumPolicy, PullConfig, PullOptions, RetryConfig, SourceKind};
pub use orchestrator::Puller;
pub use resolver::resolve_refs;
pub use transaction::{Transaction, TxOutcome, TxState};
pub use transport::{open_transport, HttpTransport, LocalTransport, RemoteTransport, RetryingTransport};
pub use types::{FetchStats, FetchedObject, PullReport, PullRequest, RefChange};
pub use verifier::Verifier;
