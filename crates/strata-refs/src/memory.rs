//! In-memory reference store for testing and ephemeral use.
//!
//! [`InMemoryRefStore`] keeps all refs in a map behind a `RwLock`. Data is
//! lost when the store is dropped.

use std::sync::RwLock;

use crate::error::{RefError, Result};
use crate::table::RefTable;
use crate::traits::RefStore;
use crate::types::{Ref, RefUpdate};

/// An in-memory implementation of [`RefStore`].
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    table: RwLock<RefTable>,
}

impl InMemoryRefStore {
    /// Create a new empty ref store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_table(&self) -> Result<std::sync::RwLockReadGuard<'_, RefTable>> {
        self.table
            .read()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))
    }

    fn write_table(&self) -> Result<std::sync::RwLockWriteGuard<'_, RefTable>> {
        self.table
            .write()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        self.read_table()?.get(name)
    }

    fn write_ref(&self, reference: &Ref) -> Result<()> {
        self.write_table()?.insert(reference)
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        Ok(self.write_table()?.remove(name))
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        self.read_table()?.with_prefix(prefix)
    }

    fn apply(&self, updates: &[RefUpdate]) -> Result<()> {
        self.write_table()?.apply(updates)
    }
}

#[cfg(test)]
mod tests {
    use strata_types::ObjectId;

    use super::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 32])
    }

    #[test]
    fn write_and_read_branch() {
        let store = InMemoryRefStore::new();
        store.write_ref(&Ref::branch("main", id(1))).unwrap();

        let read = store.read_ref("refs/heads/main").unwrap().unwrap();
        assert_eq!(read.target(), id(1));
        assert_eq!(store.resolve("refs/heads/main").unwrap(), Some(id(1)));
        assert!(store.read_ref("refs/heads/missing").unwrap().is_none());
    }

    #[test]
    fn reject_invalid_name() {
        let store = InMemoryRefStore::new();
        let err = store.write_ref(&Ref::branch("bad..name", id(1))).unwrap_err();
        assert!(matches!(err, RefError::InvalidRefName { .. }));
    }

    #[test]
    fn delete_ref() {
        let store = InMemoryRefStore::new();
        store.write_ref(&Ref::branch("main", id(1))).unwrap();
        assert!(store.delete_ref("refs/heads/main").unwrap());
        assert!(!store.delete_ref("refs/heads/main").unwrap());
    }

    #[test]
    fn list_by_namespace() {
        let store = InMemoryRefStore::new();
        store.write_ref(&Ref::branch("main", id(1))).unwrap();
        store.write_ref(&Ref::branch("dev", id(2))).unwrap();
        store.write_ref(&Ref::remote("origin", "main", id(3))).unwrap();
        store.write_ref(&Ref::remote("origin", "os/stable", id(4))).unwrap();
        store.write_ref(&Ref::remote("upstream", "main", id(5))).unwrap();

        let branches = store.branches().unwrap();
        let names: Vec<_> = branches.iter().map(|r| r.short_name()).collect();
        assert_eq!(names, ["dev", "main"]);

        assert_eq!(store.remote_refs("origin").unwrap().len(), 2);
        assert_eq!(store.remotes().unwrap(), ["origin", "upstream"]);
    }

    #[test]
    fn apply_updates_all_or_nothing() {
        let store = InMemoryRefStore::new();
        store.write_ref(&Ref::branch("a", id(1))).unwrap();

        let updates = [
            RefUpdate::new(Ref::branch("a", id(2)), Some(id(1))),
            RefUpdate::new(Ref::branch("b", id(3)), Some(id(9))),
        ];
        let err = store.apply(&updates).unwrap_err();
        assert!(matches!(err, RefError::Conflict { .. }));
        assert_eq!(store.resolve("refs/heads/a").unwrap(), Some(id(1)));
        assert_eq!(store.resolve("refs/heads/b").unwrap(), None);

        let updates = [
            RefUpdate::new(Ref::branch("a", id(2)), Some(id(1))),
            RefUpdate::new(Ref::branch("b", id(3)), None),
        ];
        store.apply(&updates).unwrap();
        assert_eq!(store.resolve("refs/heads/a").unwrap(), Some(id(2)));
        assert_eq!(store.resolve("refs/heads/b").unwrap(), Some(id(3)));
    }
}
