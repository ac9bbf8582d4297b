//! Importing a directory hierarchy into the object store.

use std::fs;
use std::path::Path;

use strata_store::{
    DirMeta, DirTree, DirTreeDir, DirTreeFile, FileHeader, FileObject, ObjectStore,
};
use strata_types::ObjectId;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SdkError, SdkResult};

/// Checksums of an imported directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportedDir {
    pub tree: ObjectId,
    pub meta: ObjectId,
}

/// Write `dir` and everything below it into `store`.
///
/// Regular files and symlinks are imported with their ownership and mode.
/// Other file types are skipped.
pub fn import_directory(store: &dyn ObjectStore, dir: &Path) -> SdkResult<ImportedDir> {
    let meta = fs::symlink_metadata(dir)?;
    if !meta.is_dir() {
        return Err(SdkError::InvalidOperation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    let (uid, gid, mode) = ownership(&meta);
    let dir_meta = store.write(&DirMeta::new(uid, gid, mode).to_stored_object()?)?;

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| SdkError::Io(e.into()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        let file_type = entry.file_type();
        if file_type.is_dir() {
            let sub = import_directory(store, path)?;
            dirs.push(DirTreeDir {
                name,
                tree: sub.tree,
                meta: sub.meta,
            });
        } else if file_type.is_file() || file_type.is_symlink() {
            let content = import_file(store, path)?;
            files.push(DirTreeFile { name, content });
        } else {
            warn!(path = %path.display(), "skipping special file");
        }
    }

    let tree = store.write(&DirTree::new(files, dirs).to_stored_object()?)?;
    debug!(path = %dir.display(), %tree, "imported directory");
    Ok(ImportedDir {
        tree,
        meta: dir_meta,
    })
}

fn import_file(store: &dyn ObjectStore, path: &Path) -> SdkResult<ObjectId> {
    let meta = fs::symlink_metadata(path)?;
    let (uid, gid, mode) = ownership(&meta);
    let object = if meta.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        FileObject::new(
            FileHeader::symlink(uid, gid, target.to_string_lossy()),
            Vec::new(),
        )
    } else {
        FileObject::new(FileHeader::regular(uid, gid, mode), fs::read(path)?)
    };
    Ok(store.write(&object.to_stored_object()?)?)
}

#[cfg(unix)]
fn ownership(meta: &fs::Metadata) -> (u32, u32, u32) {
    use std::os::unix::fs::MetadataExt;
    (meta.uid(), meta.gid(), meta.mode())
}

#[cfg(not(unix))]
fn ownership(meta: &fs::Metadata) -> (u32, u32, u32) {
    let mode = if meta.is_dir() { 0o755 } else { 0o644 };
    (0, 0, mode)
}
