//! Shared application state
//!
//! All process-wide mutable state (dedup guard + store behind the intake,
//! recent registry, producer liveness) lives behind mutexes here. Handlers
//! never hold more than one lock at a time except on the intake, which
//! serializes the guard-check/store-write/signature-register sequence so
//! racing identical submissions converge on one stored entry.

use crate::config::{Config, PRODUCER_LIVENESS_WINDOW};
use crate::events::EventBus;
use crate::registry::{RecentRecord, RecentRegistry};
use pcq_common::backup::BackupSink;
use pcq_common::intake::Intake;
use pcq_common::store::QueueStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub intake: Arc<Mutex<Intake>>,
    pub registry: Arc<Mutex<RecentRegistry>>,
    pub events: EventBus,
    pub backup: BackupSink,
    producer_seen: Arc<Mutex<Option<Instant>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = QueueStore::new(&config.queue_dir);
        let backup = BackupSink::new(&config.backup_dir);
        let events = EventBus::new(config.max_sse_clients);
        let registry = RecentRegistry::new(config.recent_capacity);

        Self {
            config: Arc::new(config),
            intake: Arc::new(Mutex::new(Intake::new(store))),
            registry: Arc::new(Mutex::new(registry)),
            events,
            backup,
            producer_seen: Arc::new(Mutex::new(None)),
        }
    }

    /// Record that an identified producer just submitted.
    pub async fn mark_producer_seen(&self) {
        *self.producer_seen.lock().await = Some(Instant::now());
    }

    /// True while a producer submitted inside the liveness window.
    pub async fn producer_live(&self) -> bool {
        self.producer_seen
            .lock()
            .await
            .map(|seen| seen.elapsed() <= PRODUCER_LIVENESS_WINDOW)
            .unwrap_or(false)
    }

    /// Insert an accepted record into the registry and fan it out.
    pub async fn announce(&self, record: RecentRecord) {
        self.registry.lock().await.push(record.clone());
        self.events.publish(&record);
    }
}
