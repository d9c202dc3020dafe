//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pcq_common::PcqError;
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Too many subscribers")]
    TooManySubscribers,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PcqError> for AppError {
    fn from(err: PcqError) -> Self {
        match err {
            PcqError::Format(message) => AppError::BadRequest(message),
            PcqError::NotFound(name) => AppError::NotFound(name),
            PcqError::PayloadTooLarge => AppError::PayloadTooLarge,
            PcqError::Storage(message) => AppError::Storage(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(ref message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound(ref name) => (StatusCode::NOT_FOUND, format!("not found: {name}")),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload too large".to_string(),
            ),
            AppError::TooManySubscribers => (
                StatusCode::SERVICE_UNAVAILABLE,
                "too many event subscribers".to_string(),
            ),
            AppError::Storage(ref message) => {
                tracing::error!("Storage error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "storage failure".to_string())
            }
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        let body = Json(json!({
            "ok": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcq_errors_map_to_http_classes() {
        assert!(matches!(
            AppError::from(PcqError::Format("x".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(PcqError::NotFound("f.json".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(PcqError::Storage("disk".into())),
            AppError::Storage(_)
        ));
    }
}
