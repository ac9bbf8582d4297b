//! The [`RefStore`] trait defining the reference storage interface.

use strata_types::ObjectId;

use crate::error::Result;
use crate::types::{Ref, RefUpdate, HEADS_PREFIX, REMOTES_PREFIX};

/// Storage backend for named references.
///
/// Implementations must be thread-safe and make [`apply`](RefStore::apply)
/// atomic: either every update in the batch lands or none does. The namespace
/// follows a hierarchical layout:
///
/// - `refs/heads/*` for local branches
/// - `refs/remotes/{remote}/*` for remote-tracking refs
pub trait RefStore: Send + Sync {
    /// Read a ref by canonical name (e.g. "refs/heads/main").
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Create or overwrite a ref unconditionally.
    fn write_ref(&self, reference: &Ref) -> Result<()>;

    /// Delete a ref by canonical name. Returns `true` if it existed.
    fn delete_ref(&self, name: &str) -> Result<bool>;

    /// List all refs whose canonical name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>>;

    /// Atomically apply a batch of compare-and-swap updates.
    ///
    /// Fails with [`RefError::Conflict`](crate::RefError::Conflict) and changes
    /// nothing if any ref's current value differs from its expected `old`.
    fn apply(&self, updates: &[RefUpdate]) -> Result<()>;

    /// Commit a ref points to, if the ref exists.
    fn resolve(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.read_ref(name)?.map(|r| r.target()))
    }

    /// List all local branches.
    fn branches(&self) -> Result<Vec<Ref>> {
        self.list_refs(HEADS_PREFIX)
    }

    /// List the remote-tracking refs of one remote.
    fn remote_refs(&self, remote: &str) -> Result<Vec<Ref>> {
        self.list_refs(&format!("{REMOTES_PREFIX}{remote}/"))
    }

    /// List all remotes that have at least one tracking ref.
    fn remotes(&self) -> Result<Vec<String>> {
        let mut remotes: Vec<String> = self
            .list_refs(REMOTES_PREFIX)?
            .into_iter()
            .filter_map(|r| match r {
                Ref::Remote { remote, .. } => Some(remote),
                Ref::Branch { .. } => None,
            })
            .collect();
        remotes.dedup();
        Ok(remotes)
    }
}
