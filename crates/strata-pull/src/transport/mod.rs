//! Transports: how the pull engine talks to a remote repository.
//!
//! - [`LocalTransport`]: another repository on a locally accessible filesystem
//! - [`HttpTransport`]: a repository served over HTTP(S)
//! - [`RetryingTransport`]: wraps either and retries transient failures

mod backoff;
mod http;
mod local;
mod retry;

use async_trait::async_trait;
use bytes::Bytes;
use strata_refs::Summary;
use strata_store::ObjectKind;
use strata_types::ObjectId;

use crate::error::PullResult;
use crate::options::SourceKind;

pub use backoff::Backoff;
pub use http::HttpTransport;
pub use local::LocalTransport;
pub use retry::RetryingTransport;

/// Read access to a remote repository.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Kind of source, which decides the default checksum policy.
    fn source_kind(&self) -> SourceKind;

    /// Human-readable location, used in errors and logs.
    fn describe(&self) -> String;

    /// Fetch the remote's advertised refs.
    async fn fetch_summary(&self) -> PullResult<Summary>;

    /// Fetch the canonical bytes of one object.
    ///
    /// A missing object is a transport error.
    async fn fetch_object(&self, id: &ObjectId, kind: ObjectKind) -> PullResult<Bytes>;
}

#[async_trait]
impl<T: RemoteTransport + ?Sized> RemoteTransport for Box<T> {
    fn source_kind(&self) -> SourceKind {
        (**self).source_kind()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn fetch_summary(&self) -> PullResult<Summary> {
        (**self).fetch_summary().await
    }

    async fn fetch_object(&self, id: &ObjectId, kind: ObjectKind) -> PullResult<Bytes> {
        (**self).fetch_object(id, kind).await
    }
}

/// Pick a transport from a remote URL.
///
/// `http://` and `https://` select HTTP; `file://<path>` or a bare path
/// selects a local repository.
pub fn open_transport(url: &str) -> PullResult<Box<dyn RemoteTransport>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Box::new(HttpTransport::new(url)?))
    } else {
        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(Box::new(LocalTransport::open(path)?))
    }
}
