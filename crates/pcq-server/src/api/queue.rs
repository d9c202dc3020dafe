//! Queue inspection and redaction endpoints

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use pcq_common::store::Listing;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::registry::RecentRecord;
use crate::state::AppState;

/// GET /queue-list
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Listing>>, AppError> {
    let intake = state.intake.lock().await;
    Ok(Json(intake.store().list()?))
}

/// GET /queue-item/:file
pub async fn item(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state.intake.lock().await.store().read_raw(&file)?;
    let content_type = if file.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ClearPartRequest {
    #[serde(default)]
    pub filename: Option<String>,
}

/// POST /queue/clear-part
///
/// Nulls the `partNumber` field of the named entry in place. The filename
/// is reduced to its basename, so traversal attempts resolve inside the
/// queue directory and fail as not-found or bad-extension.
pub async fn clear_part(
    State(state): State<AppState>,
    Json(request): Json<ClearPartRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filename = request
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::BadRequest("filename is required".to_string()))?;

    let cleared = state.intake.lock().await.store().redact_part(&filename)?;
    Ok(Json(json!({"ok": true, "file": cleared})))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub authenticated: bool,
    pub recent_records: Vec<RecentRecord>,
    pub queue_depth: usize,
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let authenticated = state.producer_live().await;
    let recent_records = state.registry.lock().await.snapshot();
    let queue_depth = state.intake.lock().await.store().depth();

    Json(StatusResponse {
        authenticated,
        recent_records,
        queue_depth,
    })
}
