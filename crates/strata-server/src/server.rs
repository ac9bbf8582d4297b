use std::net::SocketAddr;
use std::sync::Arc;

use strata_refs::FsRefStore;
use strata_store::{FsObjectStore, StoreError};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Serves one repository over HTTP in the layout pullers expect.
pub struct StrataServer {
    config: ServerConfig,
    state: AppState,
}

impl StrataServer {
    /// Open the repository named by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let objects = FsObjectStore::open(&config.repo_path).map_err(|e| match e {
            StoreError::NotARepository(path) => ServerError::RepoNotFound(path),
            other => other.into(),
        })?;
        let state = AppState {
            objects: Arc::new(objects),
            refs: Arc::new(FsRefStore::open(&config.repo_path)),
        };
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve_with_listener(listener).await
    }

    /// Serve on an already bound listener (e.g. port 0 in tests).
    pub async fn serve_with_listener(self, listener: TcpListener) -> ServerResult<()> {
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(
            %addr,
            repo = %self.config.repo_path.display(),
            "strata server listening"
        );
        axum::serve(listener, self.router())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
