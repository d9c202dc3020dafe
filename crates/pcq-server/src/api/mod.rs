//! HTTP API
//!
//! Route map:
//! - `POST /enqueue` — idempotent record submission
//! - `GET /queue-list` — every stored entry
//! - `GET /queue-item/:file` — raw stored file
//! - `GET /status` — liveness, recent records, queue depth
//! - `GET /events` — SSE feed of accepted records
//! - `POST /queue/clear-part` — redact a part number in place
//! - `GET /health` — store writability probe

pub mod enqueue;
pub mod events;
pub mod queue;

use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/enqueue", post(enqueue::enqueue))
        .route("/queue-list", get(queue::list))
        .route("/queue-item/:file", get(queue::item))
        .route("/queue/clear-part", post(queue::clear_part))
        .route("/status", get(queue::status))
        .route("/events", get(events::stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let probe = state.intake.lock().await.store().probe_writable();
    match probe {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "store": "writable"})),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "health probe found store unwritable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "degraded", "store": "unwritable"})),
            )
        }
    }
}
