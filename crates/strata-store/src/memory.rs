use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::{ObjectStore, StagingArea};

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held in memory behind a
/// `RwLock` for safe concurrent access. Objects are cloned on read/write.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    partial: RwLock<HashSet<ObjectId>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            partial: RwLock::new(HashSet::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.size)
            .sum()
    }

    fn insert_unique(&self, id: ObjectId, object: &StoredObject) -> bool {
        let mut map = self.objects.write().expect("lock poisoned");
        if map.contains_key(&id) {
            return false;
        }
        map.insert(id, object.clone());
        true
    }

    fn set_partial_marker(&self, commit: ObjectId, partial: bool) -> bool {
        let mut set = self.partial.write().expect("lock poisoned");
        let previous = set.contains(&commit);
        if partial {
            set.insert(commit);
        } else {
            set.remove(&commit);
        }
        previous
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).filter(|obj| obj.kind == kind).cloned())
    }

    fn exists(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).is_some_and(|obj| obj.kind == kind))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        self.insert_unique(id, object);
        Ok(id)
    }

    fn delete(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool> {
        let mut map = self.objects.write().expect("lock poisoned");
        if map.get(id).is_some_and(|obj| obj.kind == kind) {
            map.remove(id);
            return Ok(true);
        }
        Ok(false)
    }

    fn list(&self) -> StoreResult<Vec<(ObjectId, ObjectKind)>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut ids: Vec<(ObjectId, ObjectKind)> =
            map.iter().map(|(id, obj)| (*id, obj.kind)).collect();
        ids.sort();
        Ok(ids)
    }

    fn is_partial(&self, commit: &ObjectId) -> StoreResult<bool> {
        Ok(self.partial.read().expect("lock poisoned").contains(commit))
    }

    fn begin_staging(&self) -> StoreResult<Box<dyn StagingArea + '_>> {
        Ok(Box::new(InMemoryStaging {
            store: self,
            staged: Vec::new(),
            staged_ids: HashSet::new(),
            markers: Vec::new(),
            published: Vec::new(),
            marker_undo: Vec::new(),
        }))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &count)
            .finish()
    }
}

/// Staging area for [`InMemoryObjectStore`]: a private buffer merged into
/// the shared map on publish.
struct InMemoryStaging<'a> {
    store: &'a InMemoryObjectStore,
    staged: Vec<(ObjectId, StoredObject)>,
    staged_ids: HashSet<ObjectId>,
    markers: Vec<(ObjectId, bool)>,
    published: Vec<ObjectId>,
    marker_undo: Vec<(ObjectId, bool)>,
}

impl StagingArea for InMemoryStaging<'_> {
    fn stage(&mut self, id: ObjectId, object: &StoredObject) -> StoreResult<()> {
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        if self.staged_ids.insert(id) {
            self.staged.push((id, object.clone()));
        }
        Ok(())
    }

    fn set_partial(&mut self, commit: ObjectId, partial: bool) {
        self.markers.push((commit, partial));
    }

    fn staged_count(&self) -> usize {
        self.staged.len()
    }

    fn publish(&mut self) -> StoreResult<usize> {
        for (id, object) in &self.staged {
            if self.store.insert_unique(*id, object) {
                self.published.push(*id);
            }
        }
        for (commit, partial) in &self.markers {
            let previous = self.store.set_partial_marker(*commit, *partial);
            self.marker_undo.push((*commit, previous));
        }
        Ok(self.published.len())
    }

    fn unpublish(&mut self) -> StoreResult<()> {
        {
            let mut map = self.store.objects.write().expect("lock poisoned");
            for id in self.published.drain(..) {
                map.remove(&id);
            }
        }
        for (commit, previous) in self.marker_undo.drain(..).rev() {
            self.store.set_partial_marker(commit, previous);
        }
        Ok(())
    }

    fn discard(&mut self) -> StoreResult<()> {
        self.staged.clear();
        self.staged_ids.clear();
        self.markers.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::*;

    fn make_file(content: &[u8]) -> StoredObject {
        FileObject::new(FileHeader::regular(0, 0, 0o644), content.to_vec())
            .to_stored_object()
            .unwrap()
    }

    fn make_tree() -> StoredObject {
        DirTree::new(
            vec![DirTreeFile { name: "hello.txt".into(), content: ObjectId::from_bytes(b"hello") }],
            vec![],
        )
        .to_stored_object()
        .unwrap()
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read_file() {
        let store = InMemoryObjectStore::new();
        let obj = make_file(b"hello world");
        let id = store.write(&obj).unwrap();
        assert!(!id.is_null());

        let read_back = store.read(&id, ObjectKind::File).unwrap().expect("should exist");
        assert_eq!(read_back, obj);
    }

    #[test]
    fn read_with_wrong_kind_returns_none() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&make_tree()).unwrap();
        assert!(store.read(&id, ObjectKind::File).unwrap().is_none());
        assert!(!store.exists(&id, ObjectKind::File).unwrap());
        assert!(store.exists(&id, ObjectKind::DirTree).unwrap());
    }

    #[test]
    fn write_is_idempotent() {
        let store = InMemoryObjectStore::new();
        let obj = make_file(b"idempotent");
        let id1 = store.write(&obj).unwrap();
        let id2 = store.write(&obj).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_present_object() {
        let store = InMemoryObjectStore::new();
        let id = store.write(&make_file(b"to-delete")).unwrap();
        assert!(store.delete(&id, ObjectKind::File).unwrap());
        assert!(!store.exists(&id, ObjectKind::File).unwrap());
        assert!(!store.delete(&id, ObjectKind::File).unwrap());
    }

    #[test]
    fn list_is_sorted() {
        let store = InMemoryObjectStore::new();
        let ids = store
            .write_batch(&[make_file(b"aaa"), make_file(b"bbb"), make_tree()])
            .unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 3);
        for w in listed.windows(2) {
            assert!(w[0] <= w[1]);
        }
        for id in ids {
            assert!(listed.iter().any(|(i, _)| *i == id));
        }
    }

    #[test]
    fn total_bytes() {
        let store = InMemoryObjectStore::new();
        let a = make_file(b"12345");
        let b = make_file(b"123456789");
        store.write(&a).unwrap();
        store.write(&b).unwrap();
        assert_eq!(store.total_bytes(), a.size + b.size);
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    #[test]
    fn staged_objects_invisible_until_publish() {
        let store = InMemoryObjectStore::new();
        let obj = make_file(b"staged");
        let id = obj.compute_id();

        let mut staging = store.begin_staging().unwrap();
        staging.stage(id, &obj).unwrap();
        assert_eq!(staging.staged_count(), 1);
        assert!(!store.exists(&id, ObjectKind::File).unwrap());

        assert_eq!(staging.publish().unwrap(), 1);
        assert!(store.exists(&id, ObjectKind::File).unwrap());
    }

    #[test]
    fn discard_leaves_store_untouched() {
        let store = InMemoryObjectStore::new();
        let obj = make_file(b"discarded");
        {
            let mut staging = store.begin_staging().unwrap();
            staging.stage(obj.compute_id(), &obj).unwrap();
            staging.discard().unwrap();
        }
        assert!(store.is_empty());
    }

    #[test]
    fn unpublish_removes_only_new_objects() {
        let store = InMemoryObjectStore::new();
        let existing = make_file(b"existing");
        let existing_id = store.write(&existing).unwrap();
        let fresh = make_file(b"fresh");

        let mut staging = store.begin_staging().unwrap();
        staging.stage(existing_id, &existing).unwrap();
        staging.stage(fresh.compute_id(), &fresh).unwrap();
        assert_eq!(staging.publish().unwrap(), 1);
        staging.unpublish().unwrap();

        assert!(store.exists(&existing_id, ObjectKind::File).unwrap());
        assert!(!store.exists(&fresh.compute_id(), ObjectKind::File).unwrap());
    }

    #[test]
    fn duplicate_stage_counts_once() {
        let store = InMemoryObjectStore::new();
        let obj = make_file(b"dup");
        let mut staging = store.begin_staging().unwrap();
        staging.stage(obj.compute_id(), &obj).unwrap();
        staging.stage(obj.compute_id(), &obj).unwrap();
        assert_eq!(staging.staged_count(), 1);
    }

    #[test]
    fn partial_markers_publish_and_restore() {
        let store = InMemoryObjectStore::new();
        let commit = ObjectId::from_bytes(b"commit");

        let mut staging = store.begin_staging().unwrap();
        staging.set_partial(commit, true);
        staging.publish().unwrap();
        assert!(store.is_partial(&commit).unwrap());

        staging.unpublish().unwrap();
        assert!(!store.is_partial(&commit).unwrap());
    }

    #[test]
    fn staging_null_id_rejected() {
        let store = InMemoryObjectStore::new();
        let mut staging = store.begin_staging().unwrap();
        let err = staging.stage(ObjectId::null(), &make_file(b"x")).unwrap_err();
        assert!(matches!(err, StoreError::NullObjectId));
    }

    // -----------------------------------------------------------------------
    // Concurrent read safety
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryObjectStore::new());
        let id = store.write(&make_file(b"shared data")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let read_obj = store.read(&id, ObjectKind::File).unwrap().unwrap();
                    assert_eq!(read_obj.compute_id(), id);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryObjectStore::new();
        store.write(&make_file(b"x")).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryObjectStore"));
        assert!(debug.contains("object_count"));
    }
}
