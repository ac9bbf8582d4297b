use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::json;
use strata_refs::Summary;
use strata_store::layout;

use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "strata-server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
    }))
}

/// `GET /summary`: the repository's branches.
pub async fn summary_handler(State(state): State<AppState>) -> ServerResult<Json<Summary>> {
    Ok(Json(Summary::from_store(state.refs.as_ref())?))
}

/// `GET /objects/:prefix/:file`: a loose object exactly as stored on disk.
pub async fn object_handler(
    State(state): State<AppState>,
    Path((prefix, file)): Path<(String, String)>,
) -> ServerResult<Bytes> {
    let not_found = || ServerError::NotFound(format!("objects/{prefix}/{file}"));
    let (id, kind) = layout::parse_loose_name(&prefix, &file).ok_or_else(not_found)?;
    let objects = state.objects.clone();
    let raw = tokio::task::spawn_blocking(move || objects.read_loose(&id, kind))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    raw.map(Bytes::from).ok_or_else(not_found)
}
