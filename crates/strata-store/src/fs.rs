//! Filesystem object store.
//!
//! Repository layout handled here:
//!
//! ```text
//! <root>/objects/<hh>/<rest>.<ext>      loose objects (see `layout`)
//! <root>/state/<hex>.commitpartial      partial-commit markers
//! <root>/tmp/                           temp files and staging directories
//! ```
//!
//! Every object write goes to a temp file in `tmp/`, is fsynced, then renamed
//! into place, so a reader never observes a half-written object. Publishing a
//! staging area also fsyncs every directory it renamed into before returning,
//! so published objects survive a crash once refs point at them.

use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use strata_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::layout::{self, OBJECTS_DIR};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::{ObjectStore, StagingArea};

const STATE_DIR: &str = "state";
const TMP_DIR: &str = "tmp";

/// On-disk object store rooted at a repository directory.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create the store directories under `root` (idempotent) and open it.
    pub fn init(root: &Path) -> StoreResult<Self> {
        for dir in [OBJECTS_DIR, STATE_DIR, TMP_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root: root.to_path_buf() })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> StoreResult<Self> {
        if !root.join(OBJECTS_DIR).is_dir() {
            return Err(StoreError::NotARepository(root.display().to_string()));
        }
        fs::create_dir_all(root.join(TMP_DIR))?;
        fs::create_dir_all(root.join(STATE_DIR))?;
        Ok(Self { root: root.to_path_buf() })
    }

    /// The repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a loose object.
    pub fn object_path(&self, id: &ObjectId, kind: ObjectKind) -> PathBuf {
        self.root.join(layout::object_relpath(id, kind))
    }

    /// Read the loose on-disk bytes of an object without decoding them.
    pub fn read_loose(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.object_path(id, kind)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn partial_marker(&self, commit: &ObjectId) -> PathBuf {
        self.root.join(STATE_DIR).join(format!("{commit}.commitpartial"))
    }

    fn set_partial_marker(&self, commit: &ObjectId, partial: bool) -> StoreResult<bool> {
        let path = self.partial_marker(commit);
        let previous = path_exists(&path)?;
        if partial && !previous {
            write_synced(&path, b"")?;
        } else if !partial && previous {
            remove_if_exists(&path)?;
        }
        Ok(previous)
    }

    /// Write `bytes` to `dest` through a synced temp file and an atomic rename.
    fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = tempfile::NamedTempFile::new_in(self.root.join(TMP_DIR))?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<Option<StoredObject>> {
        match self.read_loose(id, kind)? {
            Some(raw) => Ok(Some(layout::decode_loose(kind, &raw)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool> {
        path_exists(&self.object_path(id, kind))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        let dest = self.object_path(&id, object.kind);
        if !path_exists(&dest)? {
            self.write_atomic(&dest, &layout::encode_loose(object)?)?;
        }
        Ok(id)
    }

    fn delete(&self, id: &ObjectId, kind: ObjectKind) -> StoreResult<bool> {
        remove_if_exists(&self.object_path(id, kind))
    }

    fn list(&self) -> StoreResult<Vec<(ObjectId, ObjectKind)>> {
        let mut found = Vec::new();
        let objects_dir = self.root.join(OBJECTS_DIR);
        for entry in walkdir::WalkDir::new(&objects_dir).min_depth(2).max_depth(2) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let prefix = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str());
            let name = entry.file_name().to_str();
            if let (Some(prefix), Some(name)) = (prefix, name) {
                if let Some(parsed) = layout::parse_loose_name(prefix, name) {
                    found.push(parsed);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    fn is_partial(&self, commit: &ObjectId) -> StoreResult<bool> {
        path_exists(&self.partial_marker(commit))
    }

    fn begin_staging(&self) -> StoreResult<Box<dyn StagingArea + '_>> {
        Ok(Box::new(self.staging()?))
    }
}

impl FsObjectStore {
    fn staging(&self) -> StoreResult<FsStaging<'_>> {
        let dir = self
            .root
            .join(TMP_DIR)
            .join(format!("staging-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "opened staging area");
        Ok(FsStaging {
            store: self,
            dir,
            staged: Vec::new(),
            staged_ids: HashSet::new(),
            markers: Vec::new(),
            published: Vec::new(),
            marker_undo: Vec::new(),
            synced_dirs: BTreeSet::new(),
            discarded: false,
        })
    }
}

/// Staging directory under `tmp/` for one transaction.
struct FsStaging<'a> {
    store: &'a FsObjectStore,
    dir: PathBuf,
    staged: Vec<(ObjectId, ObjectKind, PathBuf)>,
    staged_ids: HashSet<(ObjectId, ObjectKind)>,
    markers: Vec<(ObjectId, bool)>,
    published: Vec<PathBuf>,
    marker_undo: Vec<(ObjectId, bool)>,
    synced_dirs: BTreeSet<PathBuf>,
    discarded: bool,
}

impl FsStaging<'_> {
    fn publish_objects(&mut self) -> StoreResult<()> {
        let mut dirty = BTreeSet::new();
        for (id, kind, staged_path) in &self.staged {
            let dest = self.store.object_path(id, *kind);
            if path_exists(&dest)? {
                continue;
            }
            if let Some(parent) = dest.parent() {
                if !path_exists(parent)? {
                    fs::create_dir_all(parent)?;
                    dirty.insert(self.store.root.join(OBJECTS_DIR));
                }
                dirty.insert(parent.to_path_buf());
            }
            fs::rename(staged_path, &dest)?;
            self.published.push(dest);
        }
        for (commit, partial) in &self.markers {
            let previous = self.store.set_partial_marker(commit, *partial)?;
            if previous != *partial {
                dirty.insert(self.store.root.join(STATE_DIR));
            }
            self.marker_undo.push((*commit, previous));
        }
        for dir in &dirty {
            sync_dir(dir)?;
        }
        debug!(dirs = dirty.len(), "synced published directories");
        self.synced_dirs = dirty;
        Ok(())
    }
}

impl StagingArea for FsStaging<'_> {
    fn stage(&mut self, id: ObjectId, object: &StoredObject) -> StoreResult<()> {
        if self.discarded {
            return Err(StoreError::StagingClosed);
        }
        if id.is_null() {
            return Err(StoreError::NullObjectId);
        }
        if !self.staged_ids.insert((id, object.kind)) {
            return Ok(());
        }
        let path = self.dir.join(format!("{id}.{}", object.kind.extension()));
        write_synced(&path, &layout::encode_loose(object)?)?;
        self.staged.push((id, object.kind, path));
        Ok(())
    }

    fn set_partial(&mut self, commit: ObjectId, partial: bool) {
        self.markers.push((commit, partial));
    }

    fn staged_count(&self) -> usize {
        self.staged.len()
    }

    fn publish(&mut self) -> StoreResult<usize> {
        if self.discarded {
            return Err(StoreError::StagingClosed);
        }
        if let Err(e) = self.publish_objects() {
            if let Err(undo) = self.unpublish() {
                warn!(error = %undo, "failed to undo partial publish");
            }
            return Err(e);
        }
        Ok(self.published.len())
    }

    fn unpublish(&mut self) -> StoreResult<()> {
        for path in self.published.drain(..) {
            remove_if_exists(&path)?;
        }
        for (commit, previous) in self.marker_undo.drain(..).rev() {
            self.store.set_partial_marker(&commit, previous)?;
        }
        Ok(())
    }

    fn discard(&mut self) -> StoreResult<()> {
        if self.discarded {
            return Ok(());
        }
        self.discarded = true;
        self.staged.clear();
        self.markers.clear();
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for FsStaging<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.discard() {
            warn!(dir = %self.dir.display(), error = %e, "failed to remove staging directory");
        }
    }
}

fn path_exists(path: &Path) -> StoreResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn remove_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Flush a directory's entries so renames into it are durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> StoreResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> StoreResult<()> {
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}
