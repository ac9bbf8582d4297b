use strata_types::ObjectId;

use crate::error::StoreResult;
use crate::object::{ObjectKind, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written.
/// - Write-then-link: objects become visible before any ref points at them.
/// - Concurrent reads are always safe (objects are immutable).
/// - Reads never verify checksums; verification belongs to the caller.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by ID and kind.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<Option<StoredObject>>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool>;

    /// Write an object under its computed ID and return that ID.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId>;

    /// Delete an object. Returns `true` if the object existed.
    ///
    /// Deleting referenced objects corrupts the repository.
    fn delete(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool>;

    /// List every stored object, sorted by ID.
    fn list(&self) -> StoreResult<Vec<(ObjectId, ObjectKind)>>;

    /// Whether `commit` was stored without its full tree.
    fn is_partial(&self, commit: &ObjectId) -> StoreResult<bool>;

    /// Open a staging area for a transaction.
    fn begin_staging(&self) -> StoreResult<Box<dyn StagingArea + '_>>;

    /// Write multiple objects and return their IDs.
    fn write_batch(&self, objects: &[StoredObject]) -> StoreResult<Vec<ObjectId>> {
        objects.iter().map(|obj| self.write(obj)).collect()
    }
}

/// Durable but invisible holding area for objects of one transaction.
///
/// Objects are staged under the ID the caller claims for them; the store does
/// not recompute it. Nothing staged is visible to readers until
/// [`publish`](StagingArea::publish). Dropping a staging area discards its
/// staged data.
pub trait StagingArea: Send {
    /// Durably stage `object` under `id`.
    fn stage(&mut self, id: ObjectId, object: &StoredObject) -> StoreResult<()>;

    /// Record that `commit` should be marked partial (or complete) on publish.
    fn set_partial(&mut self, commit: ObjectId, partial: bool);

    /// Number of distinct objects staged so far.
    fn staged_count(&self) -> usize;

    /// Make staged objects and partial markers visible.
    ///
    /// Returns the number of objects that were not already present. On error
    /// the store is restored to its state before the call.
    fn publish(&mut self) -> StoreResult<usize>;

    /// Undo a successful [`publish`](StagingArea::publish): remove objects it
    /// added and restore partial markers.
    fn unpublish(&mut self) -> StoreResult<()>;

    /// Remove all staged data. Idempotent.
    fn discard(&mut self) -> StoreResult<()>;
}
