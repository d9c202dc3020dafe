//! End-to-end fallback-then-sync tests
//!
//! The producer buffers while the ingestion API is unreachable; once it is
//! back, the next reconcile cycle uploads the buffered record and deletes
//! the local copy.

use pcq_common::backup::BackupSink;
use pcq_common::intake::Intake;
use pcq_common::store::QueueStore;
use pcq_relay::client::EnqueueClient;
use pcq_relay::reconciler::Reconciler;
use pcq_relay::source::{InboundMessage, OriginFilter};
use pcq_relay::submit::{Outcome, Submitter};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn inbound(text: &str, message_id: Option<&str>) -> InboundMessage {
    InboundMessage {
        text: text.to_string(),
        media: None,
        message_id: message_id.map(String::from),
        origin: None,
    }
}

#[tokio::test]
async fn buffered_record_is_uploaded_and_removed() {
    let dir = TempDir::new().unwrap();
    let fallback = dir.path().join("fallback");

    // API down: the submission lands in the fallback cache.
    let mut submitter = Submitter::new(
        Intake::new(QueueStore::new(&fallback)),
        EnqueueClient::new("http://127.0.0.1:1", "relay-test"),
        OriginFilter::default(),
        BackupSink::new(dir.path().join("backup")),
    );

    let outcome = submitter
        .handle(&inbound("888-999 4pz", Some("msg-1")))
        .await;
    assert!(matches!(outcome, Outcome::Buffered { .. }));

    let store = QueueStore::new(&fallback);
    assert_eq!(store.depth(), 1);

    // API back up: the reconciler replays the minimal record, with the
    // original message id so the server can dedup a racing direct send.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enqueue"))
        .and(body_partial_json(serde_json::json!({
            "partNumber": "888-999",
            "quantity": 4,
            "sourceMessageId": "msg-1",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"ok": true, "storageRef": "record_remote.json"}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut reconciler =
        Reconciler::new(store.clone(), EnqueueClient::new(server.uri(), "relay-test"));
    assert_eq!(reconciler.run_cycle().await, 1);
    assert_eq!(store.depth(), 0);
}

#[tokio::test]
async fn duplicate_skip_from_server_still_clears_the_buffer() {
    let dir = TempDir::new().unwrap();
    let store = QueueStore::new(dir.path().join("fallback"));
    store
        .append(&pcq_common::record::PartRecord {
            part_number: "888-999".to_string(),
            quantity: Some(4),
            source_message_id: Some("msg-1".to_string()),
            ..Default::default()
        })
        .unwrap();

    // The server already processed msg-1 through another path.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enqueue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"ok": true, "skippedDuplicate": true}),
        ))
        .mount(&server)
        .await;

    let mut reconciler =
        Reconciler::new(store.clone(), EnqueueClient::new(server.uri(), "relay-test"));
    assert_eq!(reconciler.run_cycle().await, 1);
    assert_eq!(store.depth(), 0);
}

#[tokio::test]
async fn outage_across_cycles_keeps_retrying() {
    let dir = TempDir::new().unwrap();
    let store = QueueStore::new(dir.path().join("fallback"));
    store
        .append(&pcq_common::record::PartRecord::new("888-999", Some(4)))
        .unwrap();

    let mut offline = Reconciler::new(
        store.clone(),
        EnqueueClient::new("http://127.0.0.1:1", "relay-test"),
    );
    // Unbounded retry: cycles keep attempting, the file stays.
    assert_eq!(offline.run_cycle().await, 0);
    assert_eq!(offline.run_cycle().await, 0);
    assert_eq!(store.depth(), 1);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/enqueue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"ok": true, "storageRef": "record_remote.json"}),
        ))
        .mount(&server)
        .await;

    let mut online =
        Reconciler::new(store.clone(), EnqueueClient::new(server.uri(), "relay-test"));
    assert_eq!(online.run_cycle().await, 1);
    assert_eq!(store.depth(), 0);
}
