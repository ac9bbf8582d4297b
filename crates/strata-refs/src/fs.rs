//! Filesystem reference store.
//!
//! All refs of a repository live in a single `refs.json` file mapping
//! canonical names to commit checksums. Every change rewrites the file through
//! a temporary sibling and an atomic rename, so readers see either the old or
//! the new set of refs. Writers hold `refs.lock` from load to rename, so
//! stores opened separately on one repository never lose each other's
//! updates.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::lock::FileLock;
use crate::table::RefTable;
use crate::traits::RefStore;
use crate::types::{Ref, RefUpdate};

/// File holding all refs, relative to the repository root.
pub const REFS_FILE: &str = "refs.json";

/// Lock file guarding `refs.json` writes.
pub const REFS_LOCK_FILE: &str = "refs.lock";

/// A [`RefStore`] persisted to `<repo>/refs.json`.
#[derive(Debug)]
pub struct FsRefStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
}

impl FsRefStore {
    /// Open the ref store of the repository at `root`.
    ///
    /// A missing `refs.json` is treated as an empty set of refs.
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(REFS_FILE),
            lock_path: root.as_ref().join(REFS_LOCK_FILE),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RefTable> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| RefError::Serialization(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RefTable::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, table: &RefTable) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let json = serde_json::to_vec_pretty(table)
            .map_err(|e| RefError::Serialization(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| RefError::Io(e.error))?;
        debug!(path = %self.path.display(), "refs saved");
        Ok(())
    }

    /// Load, modify and save under the process lock and `refs.lock`.
    fn update<T>(&self, f: impl FnOnce(&mut RefTable) -> Result<T>) -> Result<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|e| RefError::Serialization(format!("lock poisoned: {e}")))?;
        let _file = FileLock::acquire(&self.lock_path)?;
        let mut table = self.load()?;
        let out = f(&mut table)?;
        self.save(&table)?;
        Ok(out)
    }
}

impl RefStore for FsRefStore {
    fn read_ref(&self, name: &str) -> Result<Option<Ref>> {
        self.load()?.get(name)
    }

    fn write_ref(&self, reference: &Ref) -> Result<()> {
        self.update(|table| table.insert(reference))
    }

    fn delete_ref(&self, name: &str) -> Result<bool> {
        self.update(|table| Ok(table.remove(name)))
    }

    fn list_refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        self.load()?.with_prefix(prefix)
    }

    fn apply(&self, updates: &[RefUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        self.update(|table| table.apply(updates))
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
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::open(dir.path());
        assert!(store.list_refs("").unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn refs_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FsRefStore::open(dir.path())
            .write_ref(&Ref::remote("origin", "main", id(7)))
            .unwrap();

        let reopened = FsRefStore::open(dir.path());
        assert_eq!(
            reopened.resolve("refs/remotes/origin/main").unwrap(),
            Some(id(7))
        );

        let raw = fs::read_to_string(dir.path().join(REFS_FILE)).unwrap();
        assert!(raw.contains("refs/remotes/origin/main"));
        assert!(raw.contains(&id(7).to_hex()));
    }

    #[test]
    fn failed_apply_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsRefStore::open(dir.path());
        store.write_ref(&Ref::branch("main", id(1))).unwrap();
        let before = fs::read(store.path()).unwrap();

        let err = store
            .apply(&[RefUpdate::new(Ref::branch("main", id(2)), Some(id(3)))])
            .unwrap_err();
        assert!(matches!(err, RefError::Conflict { .. }));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn separate_stores_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        std::thread::scope(|s| {
            for writer in 0..4u8 {
                let root = dir.path();
                s.spawn(move || {
                    let store = FsRefStore::open(root);
                    for n in 0..10u8 {
                        store
                            .write_ref(&Ref::branch(format!("w{writer}/r{n}"), id(writer * 10 + n)))
                            .unwrap();
                    }
                });
            }
        });

        let refs = FsRefStore::open(dir.path()).list_refs("").unwrap();
        assert_eq!(refs.len(), 40);
    }

    #[test]
    fn apply_from_two_stores_conflicts_instead_of_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let a = FsRefStore::open(dir.path());
        let b = FsRefStore::open(dir.path());

        a.apply(&[RefUpdate::new(Ref::branch("main", id(1)), None)])
            .unwrap();
        let err = b
            .apply(&[RefUpdate::new(Ref::branch("main", id(2)), None)])
            .unwrap_err();
        assert!(matches!(err, RefError::Conflict { actual: Some(_), .. }));
        assert_eq!(b.resolve("refs/heads/main").unwrap(), Some(id(1)));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(REFS_FILE), b"not json").unwrap();
        let store = FsRefStore::open(dir.path());
        assert!(matches!(
            store.read_ref("refs/heads/main"),
            Err(RefError::Serialization(_))
        ));
    }
}
