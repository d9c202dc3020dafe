//! The idempotent enqueue operation

use axum::{extract::State, Json};
use pcq_common::intake::Submission;
use pcq_common::record::PartRecord;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::registry::RecentRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub media: Option<String>,
    #[serde(default)]
    pub producer_id: Option<String>,
    #[serde(default)]
    pub source_message_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub ok: bool,
    pub storage_ref: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped_duplicate: bool,
}

/// Accept a record.
///
/// Dedup guard first: a hit answers success with `skippedDuplicate` and no
/// write. Otherwise the record is committed to the store, registered in
/// the recent registry and fanned out. A store failure engages the backup
/// tiers and still reports 500, so the producer's fallback cache keeps its
/// copy for reconciliation.
pub async fn enqueue(
    State(state): State<AppState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, AppError> {
    let record = validate(request)?;

    if record.producer_id.is_some() {
        state.mark_producer_seen().await;
    }

    let (submission, announced) = {
        let mut intake = state.intake.lock().await;
        let submission = match intake.submit(&record) {
            Ok(submission) => submission,
            Err(err) => {
                tracing::error!(
                    part = %record.part_number,
                    error = %err,
                    "primary store write failed, engaging backup tiers"
                );
                state.backup.capture(&record);
                return Err(AppError::from(err));
            }
        };

        let announced = match &submission {
            Submission::Stored { storage_ref } => intake
                .store()
                .read_entry(storage_ref)
                .map(|entry| RecentRecord {
                    storage_ref: storage_ref.clone(),
                    entry,
                })
                .ok(),
            _ => None,
        };

        (submission, announced)
    };

    match announced {
        Some(record) => state.announce(record).await,
        None => {
            tracing::info!(part = %record.part_number, "duplicate submission skipped");
        }
    }

    Ok(Json(EnqueueResponse {
        ok: true,
        storage_ref: submission.storage_ref().map(String::from),
        skipped_duplicate: submission.skipped_duplicate(),
    }))
}

fn validate(request: EnqueueRequest) -> Result<PartRecord, AppError> {
    let part_number = request
        .part_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("partNumber is required".to_string()))?;

    let quantity = match request.quantity {
        None => None,
        Some(q) if q < 0 => {
            return Err(AppError::BadRequest(
                "quantity must be a non-negative integer".to_string(),
            ))
        }
        Some(q) => Some(u32::try_from(q).map_err(|_| {
            AppError::BadRequest("quantity out of range".to_string())
        })?),
    };

    Ok(PartRecord {
        part_number,
        quantity,
        media: request.media.filter(|m| !m.is_empty()),
        source_message_id: request.source_message_id.filter(|m| !m.is_empty()),
        producer_id: request.producer_id.filter(|p| !p.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(part: Option<&str>, quantity: Option<i64>) -> EnqueueRequest {
        EnqueueRequest {
            part_number: part.map(String::from),
            quantity,
            media: None,
            producer_id: None,
            source_message_id: None,
        }
    }

    #[test]
    fn missing_part_number_is_bad_request() {
        assert!(matches!(
            validate(request(None, None)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate(request(Some("  "), None)),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn negative_quantity_is_bad_request() {
        assert!(matches!(
            validate(request(Some("888-999"), Some(-1))),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn pending_quantity_is_accepted() {
        let record = validate(request(Some("888-999"), None)).unwrap();
        assert_eq!(record.quantity, None);
    }

    #[test]
    fn skipped_flag_only_serialized_when_set() {
        let stored = serde_json::to_string(&EnqueueResponse {
            ok: true,
            storage_ref: Some("a.json".to_string()),
            skipped_duplicate: false,
        })
        .unwrap();
        assert!(!stored.contains("skippedDuplicate"));

        let skipped = serde_json::to_string(&EnqueueResponse {
            ok: true,
            storage_ref: None,
            skipped_duplicate: true,
        })
        .unwrap();
        assert!(skipped.contains("\"skippedDuplicate\":true"));
    }
}
