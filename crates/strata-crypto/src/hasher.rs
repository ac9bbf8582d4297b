use strata_types::ObjectId;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"strata-commit-v1"`) that is
/// prepended to every hash computation. A dirtree and a file with identical
/// bytes therefore produce different checksums.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        domain: "strata-commit-v1",
    };
    /// Hasher for directory tree objects.
    pub const DIRTREE: Self = Self {
        domain: "strata-dirtree-v1",
    };
    /// Hasher for directory metadata objects.
    pub const DIRMETA: Self = Self {
        domain: "strata-dirmeta-v1",
    };
    /// Hasher for file content objects (header + content).
    pub const FILE: Self = Self {
        domain: "strata-file-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ObjectId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ObjectId::from_hash(*hasher.finalize().as_bytes())
    }

    /// Verify that data produces the expected object ID.
    pub fn verify(&self, data: &[u8], expected: &ObjectId) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
