//! Fallback-cache reconciler
//!
//! Drains the local fallback cache into the ingestion API on a fixed
//! interval: at-least-once delivery, unbounded retry, no backoff. Each
//! buffered entry is rebuilt into a minimal record and submitted; a
//! confirmed acceptance deletes the local file, anything else leaves it
//! for the next cycle. A file that cannot be parsed is logged once,
//! remembered as poisoned and never retried, so one bad file cannot stall
//! the cycle forever.

use pcq_common::store::QueueStore;
use pcq_common::PcqError;
use std::collections::HashSet;
use std::time::Duration;

use crate::client::EnqueueClient;

/// Default seconds between reconcile cycles.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;

pub struct Reconciler {
    store: QueueStore,
    client: EnqueueClient,
    poisoned: HashSet<String>,
}

impl Reconciler {
    pub fn new(store: QueueStore, client: EnqueueClient) -> Self {
        Self {
            store,
            client,
            poisoned: HashSet::new(),
        }
    }

    /// One pass over the buffer. Returns the number of entries synced
    /// and deleted.
    pub async fn run_cycle(&mut self) -> usize {
        let names = match self.store.file_names() {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "fallback cache unreadable this cycle");
                return 0;
            }
        };

        let mut synced = 0;
        for name in names {
            if self.poisoned.contains(&name) {
                continue;
            }

            let entry = match self.store.read_entry(&name) {
                Ok(entry) => entry,
                Err(PcqError::NotFound(_)) => continue,
                Err(err) => {
                    tracing::warn!(filename = %name, error = %err, "poisoned buffer file, skipping permanently");
                    self.poisoned.insert(name);
                    continue;
                }
            };

            let Some(record) = entry.to_part_record() else {
                tracing::warn!(filename = %name, "buffer file has no part number, skipping permanently");
                self.poisoned.insert(name);
                continue;
            };

            match self.client.enqueue(&record).await {
                Ok(accepted) => {
                    match self.store.remove(&name) {
                        Ok(()) => {
                            synced += 1;
                            tracing::info!(
                                filename = %name,
                                storage_ref = ?accepted.storage_ref,
                                skipped_duplicate = accepted.skipped_duplicate,
                                "buffered record synced and removed"
                            );
                        }
                        Err(err) => {
                            // Still on disk; the server dedups the resend.
                            tracing::warn!(filename = %name, error = %err, "synced but local delete failed");
                        }
                    }
                }
                Err(err) => {
                    tracing::info!(filename = %name, error = %err, "sync failed, leaving for next cycle");
                }
            }
        }

        synced
    }

    /// Run cycles forever on a fixed interval. Stops only when the task
    /// is aborted at shutdown.
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let synced = self.run_cycle().await;
            if synced > 0 {
                tracing::info!(synced, "reconcile cycle complete");
            }
        }
    }
}
