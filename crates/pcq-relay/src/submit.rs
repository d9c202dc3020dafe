//! Inbound message consumer
//!
//! The single task draining the source channel. Each message runs the
//! shared normalize → guard → submit pipeline: accepted records go to the
//! ingestion API; when the API is unreachable the record is persisted into
//! the local fallback cache with the identical store schema, where the
//! reconciler picks it up. A fallback write failure falls through to the
//! backup tiers, so a validated record is never silently lost.

use pcq_common::backup::{BackupSink, BackupTier};
use pcq_common::intake::Intake;
use pcq_common::normalize;
use tokio::sync::mpsc;

use crate::client::EnqueueClient;
use crate::source::{InboundMessage, OriginFilter};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Sender not on the allow-list; dropped without reply.
    RejectedOrigin,
    /// No part-number pattern in the text; not a record, ignored.
    Ignored,
    /// Looked like a record but failed normalization; submitter notified.
    Invalid,
    /// Duplicate delivery suppressed by the local guard.
    Duplicate,
    /// Accepted by the ingestion API.
    Accepted { storage_ref: Option<String> },
    /// API unreachable; buffered in the fallback cache.
    Buffered { storage_ref: String },
    /// Fallback cache unwritable too; captured by a backup tier.
    CapturedBackup(BackupTier),
}

pub struct Submitter {
    intake: Intake,
    client: EnqueueClient,
    filter: OriginFilter,
    backup: BackupSink,
}

impl Submitter {
    pub fn new(
        intake: Intake,
        client: EnqueueClient,
        filter: OriginFilter,
        backup: BackupSink,
    ) -> Self {
        Self {
            intake,
            client,
            filter,
            backup,
        }
    }

    pub async fn handle(&mut self, message: &InboundMessage) -> Outcome {
        if !self.filter.permits(message.origin.as_deref()) {
            tracing::debug!(origin = ?message.origin, "message from unlisted origin dropped");
            return Outcome::RejectedOrigin;
        }

        if !normalize::looks_like_record(&message.text) {
            return Outcome::Ignored;
        }

        let mut record = match self.intake.normalize(&message.text) {
            Ok(record) => record,
            Err(err) => {
                // Format guidance back to the sender; the reply transport
                // is the source's concern, the notice is logged here.
                tracing::info!(origin = ?message.origin, error = %err, "format notice sent");
                return Outcome::Invalid;
            }
        };
        record.media = message.media.clone();
        record.source_message_id = message.message_id.clone();
        record.producer_id = Some(self.client.producer_id().to_string());

        if self.intake.should_skip(&record).is_some() {
            tracing::info!(
                part = %record.part_number,
                message_id = ?record.source_message_id,
                "duplicate delivery suppressed"
            );
            return Outcome::Duplicate;
        }

        match self.client.enqueue(&record).await {
            Ok(accepted) => {
                tracing::info!(
                    part = %record.part_number,
                    quantity = ?record.quantity,
                    storage_ref = ?accepted.storage_ref,
                    "record accepted by server"
                );
                Outcome::Accepted {
                    storage_ref: accepted.storage_ref,
                }
            }
            Err(pcq_common::PcqError::PayloadTooLarge) => {
                // Rejected outright, no partial write anywhere; retrying or
                // buffering the same payload cannot succeed.
                tracing::info!(part = %record.part_number, "submission rejected as too large, sender notified");
                Outcome::Invalid
            }
            Err(err) => {
                tracing::warn!(part = %record.part_number, error = %err, "server unreachable, buffering locally");
                match self.intake.persist(&record) {
                    Ok(submission) => Outcome::Buffered {
                        storage_ref: submission.storage_ref().unwrap_or_default().to_string(),
                    },
                    Err(store_err) => {
                        tracing::error!(
                            part = %record.part_number,
                            error = %store_err,
                            "fallback cache unwritable, engaging backup tiers"
                        );
                        Outcome::CapturedBackup(self.backup.capture(&record))
                    }
                }
            }
        }
    }
}

/// Drain the source channel until it closes.
pub async fn run_consumer(mut rx: mpsc::Receiver<InboundMessage>, mut submitter: Submitter) {
    while let Some(message) = rx.recv().await {
        submitter.handle(&message).await;
    }
    tracing::info!("inbound consumer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcq_common::store::QueueStore;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            text: text.to_string(),
            media: None,
            message_id: None,
            origin: None,
        }
    }

    fn submitter(dir: &TempDir, server_url: &str) -> Submitter {
        Submitter::new(
            Intake::new(QueueStore::new(dir.path().join("fallback"))),
            EnqueueClient::new(server_url, "relay-test"),
            OriginFilter::default(),
            BackupSink::new(dir.path().join("backup")),
        )
    }

    async fn accepting_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enqueue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"ok": true, "storageRef": "record_x.json"}),
            ))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn record_message_reaches_the_server() {
        let dir = TempDir::new().unwrap();
        let server = accepting_server().await;
        let mut submitter = submitter(&dir, &server.uri());

        let outcome = submitter.handle(&message("888-999 4pz")).await;
        assert_eq!(
            outcome,
            Outcome::Accepted {
                storage_ref: Some("record_x.json".to_string())
            }
        );
    }

    #[tokio::test]
    async fn chatter_without_part_pattern_is_ignored() {
        let dir = TempDir::new().unwrap();
        let server = accepting_server().await;
        let mut submitter = submitter(&dir, &server.uri());

        let outcome = submitter.handle(&message("good morning")).await;
        assert_eq!(outcome, Outcome::Ignored);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_delivery_is_suppressed_locally() {
        let dir = TempDir::new().unwrap();
        let server = accepting_server().await;
        let mut submitter = submitter(&dir, &server.uri());

        let mut msg = message("888-999 4pz");
        msg.message_id = Some("msg-1".to_string());

        assert!(matches!(
            submitter.handle(&msg).await,
            Outcome::Accepted { .. }
        ));
        assert_eq!(submitter.handle(&msg).await, Outcome::Duplicate);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreachable_server_buffers_into_fallback() {
        let dir = TempDir::new().unwrap();
        let mut submitter = submitter(&dir, "http://127.0.0.1:1");

        let outcome = submitter.handle(&message("888-999 4pz")).await;
        let Outcome::Buffered { storage_ref } = outcome else {
            panic!("expected buffered outcome, got {outcome:?}");
        };

        let store = QueueStore::new(dir.path().join("fallback"));
        let entry = store.read_entry(&storage_ref).unwrap();
        assert_eq!(entry.part_number.as_deref(), Some("888-999"));
        assert_eq!(entry.quantity, Some(4));
    }

    #[tokio::test]
    async fn unlisted_origin_is_dropped() {
        let dir = TempDir::new().unwrap();
        let server = accepting_server().await;
        let mut sub = Submitter::new(
            Intake::new(QueueStore::new(dir.path().join("fallback"))),
            EnqueueClient::new(server.uri(), "relay-test"),
            OriginFilter::from_map(HashMap::from([(
                "line-a".to_string(),
                "Line A".to_string(),
            )])),
            BackupSink::new(dir.path().join("backup")),
        );

        let mut msg = message("888-999 4pz");
        msg.origin = Some("line-b".to_string());

        assert_eq!(sub.handle(&msg).await, Outcome::RejectedOrigin);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
