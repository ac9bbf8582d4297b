use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use strata_refs::Summary;
use strata_store::ObjectKind;
use strata_types::ObjectId;
use tracing::warn;

use super::backoff::Backoff;
use super::RemoteTransport;
use crate::error::PullResult;
use crate::options::{RetryConfig, SourceKind};

/// Retries transient transport failures of an inner transport.
///
/// Each call gets its own backoff sequence. Errors other than
/// [`PullError::Transport`](crate::PullError::Transport) are returned at once.
pub struct RetryingTransport<T> {
    inner: T,
    config: RetryConfig,
}

impl<T: RemoteTransport> RetryingTransport<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    async fn with_retries<R, F, Fut>(&self, what: &str, mut op: F) -> PullResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PullResult<R>>,
    {
        let mut backoff = Backoff::from_config(&self.config);
        loop {
            match op().await {
                Err(e) if e.is_retryable() && backoff.attempts() < self.config.max_retries => {
                    let delay = backoff.next_delay();
                    warn!(
                        what,
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<T: RemoteTransport> RemoteTransport for RetryingTransport<T> {
    fn source_kind(&self) -> SourceKind {
        self.inner.source_kind()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }

    async fn fetch_summary(&self) -> PullResult<Summary> {
        self.with_retries("summary", || self.inner.fetch_summary()).await
    }

    async fn fetch_object(&self, id: &ObjectId, kind: ObjectKind) -> PullResult<Bytes> {
        self.with_retries("object", || self.inner.fetch_object(id, kind)).await
    }
}
