//! All-or-nothing commit of fetched objects and ref updates.
//!
//! Objects are staged (written durably but invisibly) as they arrive. On
//! [`Transaction::commit`], under the repository commit lock, each ref update
//! is re-based on the ref's current value, staged objects are published and
//! then every ref update is applied in one compare-and-swap. If the ref swap
//! fails, the publish is undone, so the repository ends up exactly as it was.
//!
//! Re-basing means overlapping pulls of the same refs serialize: the later
//! commit moves each ref from wherever the earlier one left it, and drops
//! updates that are already in place.

use strata_refs::{CommitLock, RefStore, RefUpdate};
use strata_store::{ObjectStore, StagingArea};
use strata_types::ObjectId;
use tracing::{debug, info, warn};

use crate::error::PullResult;
use crate::types::FetchedObject;

/// Lifecycle of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Idle,
    Staging,
    Committing,
    Done,
    /// Terminal; the repository is as it was before the transaction.
    RolledBack,
}

/// What a successful commit changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxOutcome {
    /// Objects that were not already in the store.
    pub objects_written: usize,
    pub refs_updated: Vec<RefUpdate>,
}

pub struct Transaction<'a> {
    refs: &'a dyn RefStore,
    staging: Box<dyn StagingArea + 'a>,
    ref_updates: Vec<RefUpdate>,
    state: TxState,
}

impl<'a> Transaction<'a> {
    pub fn begin(store: &'a dyn ObjectStore, refs: &'a dyn RefStore) -> PullResult<Self> {
        Ok(Self {
            refs,
            staging: store.begin_staging()?,
            ref_updates: Vec::new(),
            state: TxState::Idle,
        })
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    /// Durably stage a verified object.
    pub fn stage(&mut self, fetched: &FetchedObject) -> PullResult<()> {
        self.state = TxState::Staging;
        if let Err(e) = self.staging.stage(fetched.id, &fetched.object) {
            self.roll_back();
            return Err(e.into());
        }
        Ok(())
    }

    /// Mark `commit` partial (or complete) when the transaction commits.
    pub fn set_partial(&mut self, commit: ObjectId, partial: bool) {
        self.state = TxState::Staging;
        self.staging.set_partial(commit, partial);
    }

    /// Queue a ref update. Updates that would not move the ref are dropped.
    pub fn update_ref(&mut self, update: RefUpdate) {
        if update.is_noop() {
            debug!(name = %update.name(), "ref already up to date");
            return;
        }
        self.state = TxState::Staging;
        self.ref_updates.push(update);
    }

    /// Ref updates queued so far.
    pub fn ref_updates(&self) -> &[RefUpdate] {
        &self.ref_updates
    }

    /// Publish staged objects and swap refs while holding `commit_lock`.
    pub fn commit(mut self, commit_lock: &CommitLock) -> PullResult<TxOutcome> {
        self.state = TxState::Committing;
        let _guard = match commit_lock.acquire() {
            Ok(guard) => guard,
            Err(e) => {
                self.roll_back();
                return Err(e.into());
            }
        };
        if let Err(e) = self.rebase_ref_updates() {
            self.roll_back();
            return Err(e.into());
        }

        let objects_written = match self.staging.publish() {
            Ok(n) => n,
            Err(e) => {
                self.roll_back();
                return Err(e.into());
            }
        };
        if let Err(e) = self.refs.apply(&self.ref_updates) {
            if let Err(undo) = self.staging.unpublish() {
                warn!(error = %undo, "failed to undo publish after ref swap failure");
            }
            self.roll_back();
            return Err(e.into());
        }

        if let Err(e) = self.staging.discard() {
            warn!(error = %e, "failed to clean up staging area");
        }
        self.state = TxState::Done;
        info!(
            objects_written,
            refs_updated = self.ref_updates.len(),
            "transaction committed"
        );
        Ok(TxOutcome {
            objects_written,
            refs_updated: std::mem::take(&mut self.ref_updates),
        })
    }

    /// Point every queued update's expected value at the ref's current value,
    /// dropping updates the ref already satisfies. Call with the commit lock
    /// held.
    fn rebase_ref_updates(&mut self) -> strata_refs::Result<()> {
        let mut rebased = Vec::with_capacity(self.ref_updates.len());
        for mut update in std::mem::take(&mut self.ref_updates) {
            update.target.validate()?;
            let name = update.name();
            let current = self.refs.resolve(&name)?;
            if current == Some(update.new_commit()) {
                debug!(%name, "ref already moved to target");
                continue;
            }
            if current != update.old {
                debug!(%name, planned = ?update.old, ?current, "ref moved since planning");
                update.old = current;
            }
            rebased.push(update);
        }
        self.ref_updates = rebased;
        Ok(())
    }

    /// Abandon the transaction, discarding everything staged.
    pub fn rollback(mut self) {
        self.roll_back();
    }

    fn roll_back(&mut self) {
        if matches!(self.state, TxState::Done | TxState::RolledBack) {
            return;
        }
        if let Err(e) = self.staging.discard() {
            warn!(error = %e, "failed to discard staging area");
        }
        self.ref_updates.clear();
        self.state = TxState::RolledBack;
        debug!("transaction rolled back");
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.roll_back();
    }
}

#[cfg(test)]
mod tests {
    use strata_refs::{InMemoryRefStore, Ref, RefError};
    use strata_store::{DirTree, InMemoryObjectStore, ObjectKind};

    use super::*;
    use crate::error::{PullError, StorageError};

    fn fetched() -> FetchedObject {
        let object = DirTree::empty().to_stored_object().unwrap();
        FetchedObject {
            id: object.compute_id(),
            object,
        }
    }

    #[test]
    fn commit_publishes_objects_and_refs() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let obj = fetched();

        let mut tx = Transaction::begin(&store, &refs).unwrap();
        assert_eq!(tx.state(), TxState::Idle);
        tx.stage(&obj).unwrap();
        tx.update_ref(RefUpdate::new(Ref::branch("main", obj.id), None));
        assert_eq!(tx.state(), TxState::Staging);
        assert!(!store.exists(&obj.id, ObjectKind::DirTree).unwrap());

        let outcome = tx.commit(&CommitLock::new()).unwrap();
        assert_eq!(outcome.objects_written, 1);
        assert_eq!(outcome.refs_updated.len(), 1);
        assert!(store.exists(&obj.id, ObjectKind::DirTree).unwrap());
        assert_eq!(refs.resolve("refs/heads/main").unwrap(), Some(obj.id));
    }

    #[test]
    fn dropping_discards_staged_objects() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        {
            let mut tx = Transaction::begin(&store, &refs).unwrap();
            tx.stage(&fetched()).unwrap();
        }
        assert!(store.is_empty());
    }

    /// Ref store whose batch updates always fail.
    struct BrokenRefs(InMemoryRefStore);

    impl RefStore for BrokenRefs {
        fn read_ref(&self, name: &str) -> strata_refs::Result<Option<Ref>> {
            self.0.read_ref(name)
        }
        fn write_ref(&self, reference: &Ref) -> strata_refs::Result<()> {
            self.0.write_ref(reference)
        }
        fn delete_ref(&self, name: &str) -> strata_refs::Result<bool> {
            self.0.delete_ref(name)
        }
        fn list_refs(&self, prefix: &str) -> strata_refs::Result<Vec<Ref>> {
            self.0.list_refs(prefix)
        }
        fn apply(&self, _updates: &[RefUpdate]) -> strata_refs::Result<()> {
            Err(RefError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn failed_ref_swap_undoes_publish() {
        let store = InMemoryObjectStore::new();
        let refs = BrokenRefs(InMemoryRefStore::new());
        let obj = fetched();

        let mut tx = Transaction::begin(&store, &refs).unwrap();
        tx.stage(&obj).unwrap();
        tx.set_partial(obj.id, true);
        tx.update_ref(RefUpdate::new(Ref::branch("main", obj.id), None));

        let err = tx.commit(&CommitLock::new()).unwrap_err();
        assert!(matches!(
            err,
            PullError::Storage(StorageError::Refs(RefError::Io(_)))
        ));
        assert!(store.is_empty());
        assert!(!store.is_partial(&obj.id).unwrap());
    }

    #[test]
    fn moved_ref_is_rebased_at_commit() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let obj = fetched();
        let other = ObjectId::from_hash([9; 32]);

        let mut tx = Transaction::begin(&store, &refs).unwrap();
        tx.stage(&obj).unwrap();
        tx.update_ref(RefUpdate::new(Ref::branch("main", obj.id), None));
        // Another writer moves the ref after the update was planned.
        refs.write_ref(&Ref::branch("main", other)).unwrap();

        let outcome = tx.commit(&CommitLock::new()).unwrap();
        assert_eq!(outcome.refs_updated.len(), 1);
        assert_eq!(outcome.refs_updated[0].old, Some(other));
        assert_eq!(refs.resolve("refs/heads/main").unwrap(), Some(obj.id));
    }

    #[test]
    fn ref_already_at_target_is_dropped_at_commit() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let obj = fetched();

        let mut tx = Transaction::begin(&store, &refs).unwrap();
        tx.stage(&obj).unwrap();
        tx.update_ref(RefUpdate::new(Ref::branch("main", obj.id), None));
        refs.write_ref(&Ref::branch("main", obj.id)).unwrap();

        let outcome = tx.commit(&CommitLock::new()).unwrap();
        assert!(outcome.refs_updated.is_empty());
        assert_eq!(outcome.objects_written, 1);
    }

    #[test]
    fn invalid_ref_name_fails_before_publish() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let obj = fetched();

        let mut tx = Transaction::begin(&store, &refs).unwrap();
        tx.stage(&obj).unwrap();
        tx.update_ref(RefUpdate::new(Ref::branch("bad..name", obj.id), None));

        let err = tx.commit(&CommitLock::new()).unwrap_err();
        assert!(matches!(
            err,
            PullError::Storage(StorageError::Refs(RefError::InvalidRefName { .. }))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn noop_ref_updates_are_dropped() {
        let store = InMemoryObjectStore::new();
        let refs = InMemoryRefStore::new();
        let id = ObjectId::from_hash([1; 32]);
        let mut tx = Transaction::begin(&store, &refs).unwrap();
        tx.update_ref(RefUpdate::new(Ref::branch("main", id), Some(id)));
        assert!(tx.ref_updates().is_empty());
        let outcome = tx.commit(&CommitLock::new()).unwrap();
        assert!(outcome.refs_updated.is_empty());
    }
}
