//! Core reference types.
//!
//! References are named pointers to commits. Local branches live under
//! `refs/heads/`, remote-tracking refs written by pulls live under
//! `refs/remotes/<remote>/`.

use serde::{Deserialize, Serialize};
use strata_types::ObjectId;

use crate::error::{RefError, Result};
use crate::names::{validate_ref_name, validate_remote_name};

/// Namespace prefix for local branches.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Namespace prefix for remote-tracking refs.
pub const REMOTES_PREFIX: &str = "refs/remotes/";

/// A named reference to a commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ref {
    /// A local branch, written by local commits and mirror pulls.
    Branch {
        /// Branch name (e.g. "os/x86_64/stable").
        name: String,
        /// Commit at the tip of this branch.
        commit: ObjectId,
    },

    /// A remote-tracking ref mirroring a branch on a remote.
    ///
    /// Only updated by pulls, never directly.
    Remote {
        /// Name of the remote (e.g. "origin").
        remote: String,
        /// Branch name on the remote.
        name: String,
        /// Commit at the remote branch tip as of the last pull.
        commit: ObjectId,
    },
}

impl Ref {
    /// Build a local branch ref.
    pub fn branch(name: impl Into<String>, commit: ObjectId) -> Self {
        Ref::Branch {
            name: name.into(),
            commit,
        }
    }

    /// Build a remote-tracking ref.
    pub fn remote(remote: impl Into<String>, name: impl Into<String>, commit: ObjectId) -> Self {
        Ref::Remote {
            remote: remote.into(),
            name: name.into(),
            commit,
        }
    }

    /// Canonical name for this ref (e.g. "refs/heads/main").
    pub fn canonical_name(&self) -> String {
        match self {
            Ref::Branch { name, .. } => format!("{HEADS_PREFIX}{name}"),
            Ref::Remote { remote, name, .. } => format!("{REMOTES_PREFIX}{remote}/{name}"),
        }
    }

    /// Short name of this ref, without namespace or remote.
    pub fn short_name(&self) -> &str {
        match self {
            Ref::Branch { name, .. } | Ref::Remote { name, .. } => name,
        }
    }

    /// Commit this ref points to.
    pub fn target(&self) -> ObjectId {
        match self {
            Ref::Branch { commit, .. } | Ref::Remote { commit, .. } => *commit,
        }
    }

    /// Returns `true` if this is a remote-tracking ref.
    pub fn is_remote(&self) -> bool {
        matches!(self, Ref::Remote { .. })
    }

    /// Check that the names inside this ref are well formed.
    pub fn validate(&self) -> Result<()> {
        match self {
            Ref::Branch { name, .. } => validate_ref_name(name),
            Ref::Remote { remote, name, .. } => {
                validate_remote_name(remote)?;
                validate_ref_name(name)
            }
        }
    }

    /// Parse a canonical ref name back into a typed ref.
    pub fn from_canonical(canonical: &str, commit: ObjectId) -> Result<Self> {
        let parsed = if let Some(name) = canonical.strip_prefix(HEADS_PREFIX) {
            Ref::branch(name, commit)
        } else if let Some(rest) = canonical.strip_prefix(REMOTES_PREFIX) {
            let (remote, name) = rest.split_once('/').ok_or_else(|| RefError::InvalidRefName {
                name: canonical.to_string(),
                reason: "remote ref is missing a branch name".into(),
            })?;
            Ref::remote(remote, name, commit)
        } else {
            return Err(RefError::InvalidRefName {
                name: canonical.to_string(),
                reason: format!("must start with {HEADS_PREFIX:?} or {REMOTES_PREFIX:?}"),
            });
        };
        parsed.validate()?;
        Ok(parsed)
    }
}

/// One compare-and-swap ref update.
///
/// `old` is the value the caller observed (`None` for a ref that did not
/// exist). Applying fails with [`RefError::Conflict`] if the ref has moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    /// Target ref after the update.
    pub target: Ref,
    /// Expected current value.
    pub old: Option<ObjectId>,
}

impl RefUpdate {
    pub fn new(target: Ref, old: Option<ObjectId>) -> Self {
        Self { target, old }
    }

    /// Canonical name of the ref being updated.
    pub fn name(&self) -> String {
        self.target.canonical_name()
    }

    /// New commit the ref will point to.
    pub fn new_commit(&self) -> ObjectId {
        self.target.target()
    }

    /// `true` when the update would not change anything.
    pub fn is_noop(&self) -> bool {
        self.old == Some(self.target.target())
    }
}
