//! Ingestion API client

use pcq_common::record::PartRecord;
use pcq_common::{PcqError, Result};
use serde::Deserialize;
use serde_json::json;

/// Response to a successful enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub storage_ref: Option<String>,
    pub skipped_duplicate: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    storage_ref: Option<String>,
    #[serde(default)]
    skipped_duplicate: bool,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for the `/enqueue` endpoint.
///
/// Every failure mode — connection refused, non-2xx status, a body that
/// does not confirm acceptance — surfaces as [`PcqError::Transport`], the
/// signal for the caller to engage the fallback cache.
#[derive(Debug, Clone)]
pub struct EnqueueClient {
    http: reqwest::Client,
    base_url: String,
    producer_id: String,
}

impl EnqueueClient {
    pub fn new(base_url: impl Into<String>, producer_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            producer_id: producer_id.into(),
        }
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub async fn enqueue(&self, record: &PartRecord) -> Result<Accepted> {
        let body = json!({
            "partNumber": record.part_number,
            "quantity": record.quantity,
            "media": record.media,
            "producerId": record.producer_id.as_deref().unwrap_or(&self.producer_id),
            "sourceMessageId": record.source_message_id,
        });

        let response = self
            .http
            .post(format!("{}/enqueue", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| PcqError::Transport(format!("enqueue call failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::PAYLOAD_TOO_LARGE {
            return Err(PcqError::PayloadTooLarge);
        }
        let reply: EnqueueReply = response
            .json()
            .await
            .map_err(|e| PcqError::Transport(format!("enqueue reply unreadable: {e}")))?;

        if !status.is_success() || !reply.ok {
            return Err(PcqError::Transport(format!(
                "enqueue rejected ({status}): {}",
                reply.error.unwrap_or_else(|| "no detail".to_string())
            )));
        }

        Ok(Accepted {
            storage_ref: reply.storage_ref,
            skipped_duplicate: reply.skipped_duplicate,
        })
    }
}
