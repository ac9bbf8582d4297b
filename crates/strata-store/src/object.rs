use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_crypto::ContentHasher;
use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};

/// File type mask.
pub const S_IFMT: u32 = 0o170000;
/// Regular file.
pub const S_IFREG: u32 = 0o100000;
/// Symbolic link.
pub const S_IFLNK: u32 = 0o120000;
/// Directory.
pub const S_IFDIR: u32 = 0o040000;

/// The kind of object stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    /// A versioned snapshot pointing at a root tree and root metadata.
    Commit,
    /// Directory listing: files and subdirectories by name.
    DirTree,
    /// Directory ownership, mode, and extended attributes.
    DirMeta,
    /// File content with its header (mode, ownership, xattrs).
    File,
}

impl ObjectKind {
    /// All object kinds.
    pub const ALL: [ObjectKind; 4] = [Self::Commit, Self::DirTree, Self::DirMeta, Self::File];

    /// File extension used for loose objects on disk and over HTTP.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::DirTree => "dirtree",
            Self::DirMeta => "dirmeta",
            Self::File => "filez",
        }
    }

    /// Parse a loose-object file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "commit" => Some(Self::Commit),
            "dirtree" => Some(Self::DirTree),
            "dirmeta" => Some(Self::DirMeta),
            "filez" => Some(Self::File),
            _ => None,
        }
    }

    /// Metadata objects are everything except file content.
    pub fn is_metadata(&self) -> bool {
        !matches!(self, Self::File)
    }

    /// The domain-separated hasher for this kind.
    pub fn hasher(&self) -> &'static ContentHasher {
        match self {
            Self::Commit => &ContentHasher::COMMIT,
            Self::DirTree => &ContentHasher::DIRTREE,
            Self::DirMeta => &ContentHasher::DIRMETA,
            Self::File => &ContentHasher::FILE,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::DirTree => write!(f, "dirtree"),
            Self::DirMeta => write!(f, "dirmeta"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A stored object: kind tag + canonical bytes + cached size.
///
/// `StoredObject` is the unit of storage and transfer. The checksum of an
/// object is always computed over `data`, never over an on-disk encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectKind,
    /// The canonical bytes of the object.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        self.kind.hasher().hash(&self.data)
    }
}

fn kind_mismatch(obj: &StoredObject, expected: ObjectKind) -> StoreError {
    StoreError::CorruptObject {
        id: obj.compute_id(),
        reason: format!("expected {expected}, got {}", obj.kind),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(obj: &StoredObject) -> StoreResult<T> {
    serde_json::from_slice(&obj.data).map_err(|e| StoreError::CorruptObject {
        id: obj.compute_id(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A versioned snapshot of a directory hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// The previous commit, if any. Parents are recorded but not pulled.
    pub parent: Option<ObjectId>,
    /// One-line summary.
    pub subject: String,
    /// Free-form description.
    pub body: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Root directory tree.
    pub root_tree: ObjectId,
    /// Metadata of the root directory.
    pub root_meta: ObjectId,
    /// Arbitrary string metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Commit {
    /// Create a parentless commit.
    pub fn new(root_tree: ObjectId, root_meta: ObjectId, subject: impl Into<String>, timestamp: u64) -> Self {
        Self {
            parent: None,
            subject: subject.into(),
            body: String::new(),
            timestamp,
            root_tree,
            root_meta,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the parent commit.
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Objects this commit references (root tree, then root metadata).
    pub fn references(&self) -> Vec<(ObjectId, ObjectKind)> {
        vec![
            (self.root_tree, ObjectKind::DirTree),
            (self.root_meta, ObjectKind::DirMeta),
        ]
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data = serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::Commit, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::Commit {
            return Err(kind_mismatch(obj, ObjectKind::Commit));
        }
        decode_json(obj)
    }
}

// ---------------------------------------------------------------------------
// DirTree
// ---------------------------------------------------------------------------

/// A file entry in a directory tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirTreeFile {
    pub name: String,
    /// Checksum of the file content object.
    pub content: ObjectId,
}

/// A subdirectory entry in a directory tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirTreeDir {
    pub name: String,
    /// Checksum of the subdirectory's tree object.
    pub tree: ObjectId,
    /// Checksum of the subdirectory's metadata object.
    pub meta: ObjectId,
}

/// Directory listing object.
///
/// Files and subdirectories are kept in separate lists, each sorted by name
/// so that the same directory always hashes to the same checksum.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirTree {
    pub files: Vec<DirTreeFile>,
    pub dirs: Vec<DirTreeDir>,
}

impl DirTree {
    /// Create a tree, sorting both entry lists by name.
    pub fn new(mut files: Vec<DirTreeFile>, mut dirs: Vec<DirTreeDir>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        dirs.sort_by(|a, b| a.name.cmp(&b.name));
        Self { files, dirs }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Objects this tree references: file contents first, then each
    /// subdirectory's tree and metadata.
    pub fn references(&self) -> Vec<(ObjectId, ObjectKind)> {
        let mut refs: Vec<(ObjectId, ObjectKind)> = self
            .files
            .iter()
            .map(|f| (f.content, ObjectKind::File))
            .collect();
        for dir in &self.dirs {
            refs.push((dir.tree, ObjectKind::DirTree));
            refs.push((dir.meta, ObjectKind::DirMeta));
        }
        refs
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data = serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::DirTree, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::DirTree {
            return Err(kind_mismatch(obj, ObjectKind::DirTree));
        }
        decode_json(obj)
    }
}

// ---------------------------------------------------------------------------
// DirMeta
// ---------------------------------------------------------------------------

/// An extended attribute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xattr {
    pub name: String,
    pub value: Vec<u8>,
}

/// Directory ownership and permission metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirMeta {
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    #[serde(default)]
    pub xattrs: Vec<Xattr>,
}

impl DirMeta {
    /// Metadata for a directory owned by `uid:gid` with permission bits `perms`.
    pub fn new(uid: u32, gid: u32, perms: u32) -> Self {
        Self {
            uid,
            gid,
            mode: S_IFDIR | (perms & 0o7777),
            xattrs: Vec::new(),
        }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data = serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::DirMeta, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::DirMeta {
            return Err(kind_mismatch(obj, ObjectKind::DirMeta));
        }
        decode_json(obj)
    }
}

// ---------------------------------------------------------------------------
// FileObject
// ---------------------------------------------------------------------------

/// The type of a content object, derived from its mode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Symlink,
    /// Anything else (devices, fifos, sockets, directories).
    Other(u32),
}

/// Header of a file content object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Full mode including the file type bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Target of a symbolic link; `None` for regular files.
    pub symlink_target: Option<String>,
    pub xattrs: Vec<Xattr>,
}

impl FileHeader {
    /// Header for a regular file with permission bits `perms`.
    pub fn regular(uid: u32, gid: u32, perms: u32) -> Self {
        Self {
            mode: S_IFREG | (perms & 0o7777),
            uid,
            gid,
            symlink_target: None,
            xattrs: Vec::new(),
        }
    }

    /// Header for a symbolic link.
    pub fn symlink(uid: u32, gid: u32, target: impl Into<String>) -> Self {
        Self {
            mode: S_IFLNK | 0o777,
            uid,
            gid,
            symlink_target: Some(target.into()),
            xattrs: Vec::new(),
        }
    }

    pub fn file_type(&self) -> FileType {
        match self.mode & S_IFMT {
            S_IFREG => FileType::Regular,
            S_IFLNK => FileType::Symlink,
            other => FileType::Other(other),
        }
    }

    /// Permission bits (including setuid/setgid/sticky).
    pub fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// File content object: header plus raw content.
///
/// Encoded with bincode; the checksum covers both header and content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub header: FileHeader,
    pub content: Vec<u8>,
}

impl FileObject {
    pub fn new(header: FileHeader, content: Vec<u8>) -> Self {
        Self { header, content }
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> StoreResult<StoredObject> {
        let data = bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(StoredObject::new(ObjectKind::File, data))
    }

    /// Decode from a `StoredObject`.
    pub fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != ObjectKind::File {
            return Err(kind_mismatch(obj, ObjectKind::File));
        }
        bincode::deserialize(&obj.data).map_err(|e| StoreError::CorruptObject {
            id: obj.compute_id(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &[u8]) -> FileObject {
        FileObject::new(FileHeader::regular(0, 0, 0o644), content.to_vec())
    }

    #[test]
    fn commit_roundtrip() {
        let commit = Commit::new(ObjectId::from_bytes(b"tree"), ObjectId::from_bytes(b"meta"), "init", 1_700_000_000)
            .with_parent(ObjectId::from_bytes(b"parent"));
        let stored = commit.to_stored_object().unwrap();
        assert_eq!(stored.kind, ObjectKind::Commit);
        assert_eq!(Commit::from_stored_object(&stored).unwrap(), commit);
    }

    #[test]
    fn commit_references_tree_then_meta() {
        let tree = ObjectId::from_bytes(b"tree");
        let meta = ObjectId::from_bytes(b"meta");
        let commit = Commit::new(tree, meta, "s", 0);
        assert_eq!(
            commit.references(),
            vec![(tree, ObjectKind::DirTree), (meta, ObjectKind::DirMeta)]
        );
    }

    #[test]
    fn dirtree_entries_sorted() {
        let tree = DirTree::new(
            vec![
                DirTreeFile { name: "zebra".into(), content: ObjectId::null() },
                DirTreeFile { name: "alpha".into(), content: ObjectId::null() },
            ],
            vec![
                DirTreeDir { name: "usr".into(), tree: ObjectId::null(), meta: ObjectId::null() },
                DirTreeDir { name: "etc".into(), tree: ObjectId::null(), meta: ObjectId::null() },
            ],
        );
        assert_eq!(tree.files[0].name, "alpha");
        assert_eq!(tree.dirs[0].name, "etc");
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn dirtree_references_files_then_dirs() {
        let content = ObjectId::from_bytes(b"c");
        let sub_tree = ObjectId::from_bytes(b"t");
        let sub_meta = ObjectId::from_bytes(b"m");
        let tree = DirTree::new(
            vec![DirTreeFile { name: "a".into(), content }],
            vec![DirTreeDir { name: "d".into(), tree: sub_tree, meta: sub_meta }],
        );
        assert_eq!(
            tree.references(),
            vec![
                (content, ObjectKind::File),
                (sub_tree, ObjectKind::DirTree),
                (sub_meta, ObjectKind::DirMeta),
            ]
        );
    }

    #[test]
    fn empty_dirtree() {
        let tree = DirTree::empty();
        assert!(tree.is_empty());
        assert!(tree.references().is_empty());
    }

    #[test]
    fn dirmeta_sets_directory_bits() {
        let meta = DirMeta::new(0, 0, 0o755);
        assert_eq!(meta.mode & S_IFMT, S_IFDIR);
        let stored = meta.to_stored_object().unwrap();
        assert_eq!(DirMeta::from_stored_object(&stored).unwrap(), meta);
    }

    #[test]
    fn file_object_roundtrip() {
        let obj = file(b"hello world");
        let stored = obj.to_stored_object().unwrap();
        assert_eq!(FileObject::from_stored_object(&stored).unwrap(), obj);
    }

    #[test]
    fn file_header_types() {
        assert_eq!(FileHeader::regular(0, 0, 0o644).file_type(), FileType::Regular);
        assert_eq!(FileHeader::symlink(0, 0, "target").file_type(), FileType::Symlink);
        let mut fifo = FileHeader::regular(0, 0, 0o644);
        fifo.mode = 0o010644;
        assert_eq!(fifo.file_type(), FileType::Other(0o010000));
    }

    #[test]
    fn file_header_permissions_strip_type() {
        let header = FileHeader::regular(0, 0, 0o4755);
        assert_eq!(header.permissions(), 0o4755);
    }

    #[test]
    fn header_changes_checksum() {
        let a = FileObject::new(FileHeader::regular(0, 0, 0o644), b"x".to_vec());
        let b = FileObject::new(FileHeader::regular(0, 0, 0o755), b"x".to_vec());
        assert_ne!(
            a.to_stored_object().unwrap().compute_id(),
            b.to_stored_object().unwrap().compute_id()
        );
    }

    #[test]
    fn kind_mismatch_is_corrupt() {
        let stored = StoredObject::new(ObjectKind::File, b"{}".to_vec());
        let err = DirTree::from_stored_object(&stored).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn garbage_metadata_is_corrupt() {
        let stored = StoredObject::new(ObjectKind::Commit, b"not json".to_vec());
        assert!(matches!(
            Commit::from_stored_object(&stored),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn extension_mapping() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(ObjectKind::from_extension("blob"), None);
        assert!(ObjectKind::DirMeta.is_metadata());
        assert!(!ObjectKind::File.is_metadata());
    }

    #[test]
    fn different_kinds_produce_different_ids() {
        let data = b"same data".to_vec();
        let commit = StoredObject::new(ObjectKind::Commit, data.clone());
        let file = StoredObject::new(ObjectKind::File, data);
        assert_ne!(commit.compute_id(), file.compute_id());
    }

    #[test]
    fn object_kind_display() {
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
        assert_eq!(ObjectKind::DirTree.to_string(), "dirtree");
        assert_eq!(ObjectKind::DirMeta.to_string(), "dirmeta");
        assert_eq!(ObjectKind::File.to_string(), "file");
    }
}
