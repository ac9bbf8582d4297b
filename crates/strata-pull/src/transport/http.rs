use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::StatusCode;
use strata_refs::Summary;
use strata_store::{layout, ObjectKind};
use strata_types::ObjectId;
use tracing::debug;

use super::RemoteTransport;
use crate::error::{PullError, PullResult};
use crate::options::SourceKind;

/// Path of the ref summary under the base URL.
pub const SUMMARY_PATH: &str = "summary";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A remote repository served over HTTP.
///
/// Layout under the base URL:
///
/// ```text
/// GET {base}/summary                       {"refs": {"<name>": "<hex>"}}
/// GET {base}/objects/<hh>/<rest>.<ext>     loose object bytes
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> PullResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PullError::transport(base_url.clone(), e.to_string()))?;
        Ok(Self::with_client(base_url, http))
    }

    /// Use an existing client (shared connection pool).
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn error(&self, reason: impl std::fmt::Display) -> PullError {
        PullError::transport(self.base_url.clone(), reason.to_string())
    }

    /// GET `path`, refusing bodies longer than `limit` bytes.
    async fn get(&self, path: &str, limit: u64) -> PullResult<Bytes> {
        let url = format!("{}/{path}", self.base_url);
        debug!(url = %url, "GET");
        let mut resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.error(e))?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(self.error(format!("GET {url} returned {status}")));
        }
        let too_large = || self.error(format!("GET {url}: body larger than {limit} bytes"));
        if resp.content_length().is_some_and(|len| len > limit) {
            return Err(too_large());
        }
        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| self.error(e))? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body.freeze())
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    fn source_kind(&self) -> SourceKind {
        SourceKind::Http
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_summary(&self) -> PullResult<Summary> {
        let body = self.get(SUMMARY_PATH, layout::MAX_METADATA_SIZE).await?;
        serde_json::from_slice(&body).map_err(|e| self.error(format!("malformed summary: {e}")))
    }

    async fn fetch_object(&self, id: &ObjectId, kind: ObjectKind) -> PullResult<Bytes> {
        let raw = self
            .get(&layout::object_relpath(id, kind), layout::max_encoded_size(kind))
            .await?;
        let object = layout::decode_loose(kind, &raw)
            .map_err(|e| self.error(format!("malformed {kind} object {id}: {e}")))?;
        Ok(Bytes::from(object.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let transport = HttpTransport::new("http://127.0.0.1:9418/repo/").unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9418/repo");
        assert_eq!(transport.source_kind(), SourceKind::Http);
    }

    /// Serve one canned HTTP response on an ephemeral port.
    async fn serve_once(head: String) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn oversized_summary_is_refused() {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            layout::MAX_METADATA_SIZE + 1
        );
        let transport = HttpTransport::new(&serve_once(head).await).unwrap();
        let err = transport.fetch_summary().await.unwrap_err();
        assert!(matches!(err, PullError::Transport { .. }));
        assert!(err.to_string().contains("larger than"), "{err}");
    }

    #[tokio::test]
    async fn missing_object_is_transport_error() {
        let head = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
        let transport = HttpTransport::new(&serve_once(head.to_string()).await).unwrap();
        let err = transport
            .fetch_object(&ObjectId::from_hash([1; 32]), ObjectKind::DirMeta)
            .await
            .unwrap_err();
        assert!(matches!(err, PullError::Transport { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to be listening.
        let transport = HttpTransport::new("http://127.0.0.1:9").unwrap();
        let err = transport.fetch_summary().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
