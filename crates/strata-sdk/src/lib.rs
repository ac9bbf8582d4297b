//! High-level SDK for Strata.
//!
//! [`Repo`] is the main entry point: it opens an on-disk repository, manages
//! its remotes and configuration, imports directories as commits and pulls
//! from remotes over the filesystem or HTTP.
//!
//! ```no_run
//! # async fn demo() -> strata_sdk::SdkResult<()> {
//! use strata_sdk::{PullOptions, Repo};
//!
//! let mut repo = Repo::init("/srv/mirror")?;
//! repo.add_remote("origin", "https://updates.example.com/repo")?;
//! let options = PullOptions { mirror: true, ..Default::default() };
//! let report = repo.pull("origin", &[], options).await?;
//! println!("{} refs updated", report.refs_updated.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod import;
pub mod repository;

pub use config::{RemoteConfig, RepoConfig};
pub use error::{SdkError, SdkResult};
pub use import::{import_directory, ImportedDir};
pub use repository::Repo;

// Re-export key types
pub use strata_pull::{PullError, PullErrorKind, PullOptions, PullReport, RefChange};
pub use strata_refs::Ref;
pub use strata_types::ObjectId;
