use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use strata_refs::{FsRefStore, RefStore, Summary};
use strata_store::{FsObjectStore, ObjectKind, ObjectStore};
use strata_types::ObjectId;
use tracing::debug;

use super::RemoteTransport;
use crate::error::{PullError, PullResult};
use crate::options::SourceKind;

/// A remote that is another repository reachable through local stores.
#[derive(Clone)]
pub struct LocalTransport {
    location: String,
    objects: Arc<dyn ObjectStore>,
    refs: Arc<dyn RefStore>,
}

impl LocalTransport {
    /// Serve objects and refs straight from the given stores.
    pub fn new(
        location: impl Into<String>,
        objects: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
    ) -> Self {
        Self {
            location: location.into(),
            objects,
            refs,
        }
    }

    /// Open the on-disk repository at `path`.
    pub fn open(path: impl AsRef<Path>) -> PullResult<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let objects = FsObjectStore::open(path)
            .map_err(|e| PullError::transport(location.clone(), e.to_string()))?;
        let refs = FsRefStore::open(path);
        Ok(Self::new(location, Arc::new(objects), Arc::new(refs)))
    }

    fn unreachable(&self, err: impl std::fmt::Display) -> PullError {
        PullError::transport(self.location.clone(), err.to_string())
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteTransport for LocalTransport {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn describe(&self) -> String {
        self.location.clone()
    }

    async fn fetch_summary(&self) -> PullResult<Summary> {
        Summary::from_store(self.refs.as_ref()).map_err(|e| self.unreachable(e))
    }

    async fn fetch_object(&self, id: &ObjectId, kind: ObjectKind) -> PullResult<Bytes> {
        debug!(%id, %kind, location = %self.location, "reading local object");
        match self.objects.read(id, kind).map_err(|e| self.unreachable(e))? {
            Some(object) => Ok(Bytes::from(object.data)),
            None => Err(self.unreachable(format!("{kind} object {id} not found"))),
        }
    }
}
