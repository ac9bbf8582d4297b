use serde::Serialize;
use strata_store::StoredObject;
use strata_types::ObjectId;

use crate::options::PullOptions;

/// One pull invocation: which remote, which refs, how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    /// Remote name, used for `refs/remotes/<remote>/` and in errors.
    pub remote: String,
    /// Refs to pull. Empty means every advertised ref under `mirror`, and
    /// nothing otherwise.
    pub refs: Vec<String>,
    pub options: PullOptions,
}

impl PullRequest {
    pub fn new(remote: impl Into<String>, refs: &[String], options: PullOptions) -> Self {
        Self {
            remote: remote.into(),
            refs: refs.to_vec(),
            options,
        }
    }
}

/// An object that has been fetched and accepted by the verifier.
#[derive(Clone, Debug)]
pub struct FetchedObject {
    /// Checksum the object was requested under.
    pub id: ObjectId,
    pub object: StoredObject,
}

/// Counters accumulated while walking the object graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub objects_fetched: usize,
    pub bytes_fetched: u64,
    /// Objects not fetched because they were already present locally.
    pub objects_skipped: usize,
}

/// A local ref moved by a pull.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefChange {
    /// Canonical local name, e.g. `refs/remotes/origin/main`.
    pub name: String,
    pub old: Option<ObjectId>,
    pub new: ObjectId,
}

/// Outcome of a successful pull.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub remote: String,
    pub refs_updated: Vec<RefChange>,
    #[serde(flatten)]
    pub stats: FetchStats,
    /// Objects newly added to the local store by the commit.
    pub objects_written: usize,
}

impl PullReport {
    pub fn empty(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            ..Default::default()
        }
    }

    /// `true` if the pull changed nothing locally.
    pub fn is_up_to_date(&self) -> bool {
        self.refs_updated.is_empty() && self.objects_written == 0
    }
}
