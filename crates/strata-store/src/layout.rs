//! Loose-object layout shared by the filesystem backend, the HTTP server and
//! the HTTP transport.
//!
//! ```text
//! objects/<first 2 hex>/<remaining 62 hex>.<extension>
//! ```
//!
//! File objects are zstd-compressed on disk (`.filez`); metadata objects are
//! stored as their canonical bytes.

use std::io::Read;

use strata_types::ObjectId;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};

/// Directory holding loose objects, relative to the repository root.
pub const OBJECTS_DIR: &str = "objects";

const ZSTD_LEVEL: i32 = 3;

/// Largest decoded metadata object accepted from disk or the wire.
pub const MAX_METADATA_SIZE: u64 = 10 * 1024 * 1024;

/// Largest decoded file object accepted from disk or the wire.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Size limit for decoded objects of `kind`.
pub fn max_object_size(kind: ObjectKind) -> u64 {
    if kind.is_metadata() {
        MAX_METADATA_SIZE
    } else {
        MAX_FILE_SIZE
    }
}

/// Size limit for the loose encoding of `kind`, with headroom for
/// incompressible file content.
pub fn max_encoded_size(kind: ObjectKind) -> u64 {
    match kind {
        ObjectKind::File => MAX_FILE_SIZE + MAX_FILE_SIZE / 128 + 1024,
        _ => MAX_METADATA_SIZE,
    }
}

/// Relative path of a loose object, e.g. `objects/ab/cdef….commit`.
pub fn object_relpath(id: &ObjectId, kind: ObjectKind) -> String {
    let hex = id.to_hex();
    format!("{OBJECTS_DIR}/{}/{}.{}", &hex[..2], &hex[2..], kind.extension())
}

/// Parse the two trailing path segments of a loose object
/// (`"ab"`, `"cdef….commit"`).
pub fn parse_loose_name(prefix: &str, file_name: &str) -> Option<(ObjectId, ObjectKind)> {
    let (rest, ext) = file_name.rsplit_once('.')?;
    let kind = ObjectKind::from_extension(ext)?;
    if prefix.len() != 2 {
        return None;
    }
    let hex = format!("{prefix}{rest}");
    if !ObjectId::is_hex_checksum(&hex) {
        return None;
    }
    let id = ObjectId::from_hex(&hex.to_ascii_lowercase()).ok()?;
    Some((id, kind))
}

/// Encode an object's canonical bytes into its loose on-disk form.
pub fn encode_loose(object: &StoredObject) -> StoreResult<Vec<u8>> {
    match object.kind {
        ObjectKind::File => zstd::encode_all(object.data.as_slice(), ZSTD_LEVEL)
            .map_err(|e| StoreError::Compression(e.to_string())),
        _ => Ok(object.data.clone()),
    }
}

/// Decode loose on-disk bytes back into a `StoredObject`, refusing anything
/// that decodes past [`max_object_size`].
pub fn decode_loose(kind: ObjectKind, raw: &[u8]) -> StoreResult<StoredObject> {
    decode_loose_limited(kind, raw, max_object_size(kind))
}

/// [`decode_loose`] with an explicit limit on the decoded size.
///
/// Decompression stops one byte past `limit`, so a small compressed payload
/// can never expand into an unbounded allocation.
pub fn decode_loose_limited(kind: ObjectKind, raw: &[u8], limit: u64) -> StoreResult<StoredObject> {
    let data = match kind {
        ObjectKind::File => {
            let compression = |e: std::io::Error| StoreError::Compression(e.to_string());
            let decoder = zstd::stream::read::Decoder::new(raw).map_err(compression)?;
            let mut data = Vec::new();
            decoder
                .take(limit.saturating_add(1))
                .read_to_end(&mut data)
                .map_err(compression)?;
            data
        }
        _ => raw.to_vec(),
    };
    if data.len() as u64 > limit {
        return Err(StoreError::ObjectTooLarge { kind, limit });
    }
    Ok(StoredObject::new(kind, data))
}
