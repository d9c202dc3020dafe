//! Subscriber fan-out
//!
//! Accepted records are serialized once and published to every live SSE
//! subscriber through a broadcast channel. A subscriber whose connection
//! closes drops its receiver and disappears from the bus; fan-out is
//! best-effort and carries no replay for subscribers that were offline —
//! the startup importer and the registry snapshot cover that gap.

use crate::registry::RecentRecord;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Per-subscriber buffer; slow consumers past this lag lose events.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<String>>,
    max_subscribers: usize,
}

impl EventBus {
    pub fn new(max_subscribers: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            max_subscribers,
        }
    }

    /// Attach a new subscriber, or `None` when the connection cap is hit.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Arc<String>>> {
        if self.sender.receiver_count() >= self.max_subscribers {
            tracing::warn!(
                subscribers = self.sender.receiver_count(),
                "rejecting event subscriber over cap"
            );
            return None;
        }
        Some(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Serialize the record once and push it to every live subscriber.
    pub fn publish(&self, record: &RecentRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => Arc::new(payload),
            Err(err) => {
                tracing::error!(error = %err, "record not serializable for fan-out");
                return;
            }
        };

        // Err means no live subscribers; nothing to deliver.
        let delivered = self.sender.send(payload).unwrap_or(0);
        tracing::debug!(
            subscribers = delivered,
            storage_ref = %record.storage_ref,
            "record fanned out"
        );
    }
}
