//! Repository write locks.
//!
//! A [`FileLock`] is an exclusive `flock(2)` on a lock file, held until it is
//! dropped. Every acquisition opens the file anew, so it excludes other
//! processes as well as other handles in this process.
//!
//! A [`CommitLock`] is what writers hold while publishing objects and moving
//! refs. It pairs an in-process mutex with an optional lock file so that
//! handles opened separately on one repository still take turns.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use crate::error::Result;

/// Commit lock file, relative to the repository root.
pub const COMMIT_LOCK_FILE: &str = "commit.lock";

/// Exclusive advisory lock on a file.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the lock on `path` is ours, creating the file if needed.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;
        lock_exclusive(&file)?;
        trace!(path = %path.display(), "lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        unlock(&self.file);
        trace!(path = %self.path.display(), "lock released");
    }
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    loop {
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

// No advisory locking off unix; the in-process mutex still applies.
#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}

/// Serializes the commit phase of every writer of one repository.
#[derive(Debug, Default)]
pub struct CommitLock {
    local: Mutex<()>,
    path: Option<PathBuf>,
}

/// Held commit lock; released on drop.
#[derive(Debug)]
pub struct CommitGuard<'a> {
    _file: Option<FileLock>,
    _local: MutexGuard<'a, ()>,
}

impl CommitLock {
    /// A lock that only serializes writers within this process.
    pub fn new() -> Self {
        Self::default()
    }

    /// A lock that also holds `path` exclusively, excluding other processes.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            local: Mutex::new(()),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Block until the commit lock is held.
    pub fn acquire(&self) -> Result<CommitGuard<'_>> {
        // The mutex guards no data; a poisoned one is still usable.
        let local = self.local.lock().unwrap_or_else(|e| e.into_inner());
        let file = self.path.as_deref().map(FileLock::acquire).transpose()?;
        Ok(CommitGuard {
            _file: file,
            _local: local,
        })
    }
}
