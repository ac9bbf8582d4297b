use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use strata_refs::FsRefStore;
use strata_store::FsObjectStore;
use tower_http::trace::TraceLayer;

use crate::handler;

/// Shared handler state: the served repository.
#[derive(Clone)]
pub struct AppState {
    pub objects: Arc<FsObjectStore>,
    pub refs: Arc<FsRefStore>,
}

/// Build the axum router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/summary", get(handler::summary_handler))
        .route("/objects/:prefix/:file", get(handler::object_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
