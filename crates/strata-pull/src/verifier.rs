//! Acceptance checks for fetched objects.

use strata_store::{FileObject, FileType, ObjectKind, StoredObject};
use strata_types::ObjectId;
use tracing::trace;

use crate::error::{PullError, PullResult};
use crate::options::{ChecksumPolicy, PullOptions, SourceKind};

/// Permission bits a regular file may carry under `bare_user_only_files`.
pub const BARE_USER_ONLY_MASK: u32 = 0o775;

/// Checks every fetched object before it is staged.
#[derive(Clone, Copy, Debug)]
pub struct Verifier {
    checksum: ChecksumPolicy,
    bare_user_only_files: bool,
}

impl Verifier {
    pub fn new(source: SourceKind, options: &PullOptions) -> Self {
        Self {
            checksum: ChecksumPolicy::for_source(source, options),
            bare_user_only_files: options.bare_user_only_files,
        }
    }

    pub fn checksum_policy(&self) -> ChecksumPolicy {
        self.checksum
    }

    /// Accept or reject `object`, which was requested as `claimed`.
    pub fn verify(&self, claimed: &ObjectId, object: &StoredObject) -> PullResult<()> {
        if self.checksum == ChecksumPolicy::Verify {
            let computed = object.compute_id();
            if computed != *claimed {
                return Err(PullError::ChecksumMismatch {
                    kind: object.kind,
                    expected: *claimed,
                    computed,
                });
            }
        }
        if self.bare_user_only_files && object.kind == ObjectKind::File {
            check_file_mode(claimed, object)?;
        }
        trace!(id = %claimed, kind = %object.kind, "object accepted");
        Ok(())
    }
}

fn check_file_mode(id: &ObjectId, object: &StoredObject) -> PullResult<()> {
    let file = FileObject::from_stored_object(object).map_err(|e| PullError::PermissionPolicy {
        id: *id,
        mode: 0,
        reason: format!("unreadable file header: {e}"),
    })?;
    let mode = file.header.mode;
    match file.header.file_type() {
        FileType::Symlink => Ok(()),
        FileType::Regular if file.header.permissions() & !BARE_USER_ONLY_MASK == 0 => Ok(()),
        FileType::Regular => Err(PullError::PermissionPolicy {
            id: *id,
            mode,
            reason: format!("permission bits exceed {BARE_USER_ONLY_MASK:o}"),
        }),
        FileType::Other(_) => Err(PullError::PermissionPolicy {
            id: *id,
            mode,
            reason: "not a regular file or symlink".into(),
        }),
    }
}
