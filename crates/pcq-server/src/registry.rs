//! Bounded most-recent-first record registry
//!
//! A fixed-capacity view of the latest accepted records, served by
//! `/status` and replayed to subscribers connecting after startup. The
//! durable store stays the source of truth; this is a cache, evicting the
//! oldest entry at capacity.

use pcq_common::record::QueueEntry;
use serde::Serialize;
use std::collections::VecDeque;

/// One accepted record together with its storage reference.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecord {
    pub storage_ref: String,
    #[serde(flatten)]
    pub entry: QueueEntry,
}

/// Fixed-capacity, newest-first.
#[derive(Debug)]
pub struct RecentRegistry {
    capacity: usize,
    records: VecDeque<RecentRecord>,
}

impl RecentRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert a newly accepted record at the head, evicting the oldest
    /// when at capacity.
    pub fn push(&mut self, record: RecentRecord) {
        self.records.push_front(record);
        while self.records.len() > self.capacity {
            self.records.pop_back();
        }
    }

    /// Append an older record during startup import. Returns false once
    /// the registry is full; import stops there (truncated at capacity).
    pub fn push_older(&mut self, record: RecentRecord) -> bool {
        if self.records.len() >= self.capacity {
            return false;
        }
        self.records.push_back(record);
        true
    }

    pub fn contains_message_id(&self, message_id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.entry.source_message_id.as_deref() == Some(message_id))
    }

    /// Newest-first snapshot.
    pub fn snapshot(&self) -> Vec<RecentRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(storage_ref: &str, message_id: Option<&str>) -> RecentRecord {
        RecentRecord {
            storage_ref: storage_ref.to_string(),
            entry: QueueEntry {
                part_number: Some("888-999".to_string()),
                quantity: Some(4),
                recorded_at: Utc::now(),
                media: None,
                source_message_id: message_id.map(String::from),
                producer_id: None,
            },
        }
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut registry = RecentRegistry::new(2);
        registry.push(record("a.json", None));
        registry.push(record("b.json", None));
        registry.push(record("c.json", None));

        let refs: Vec<_> = registry.snapshot().iter().map(|r| r.storage_ref.clone()).collect();
        assert_eq!(refs, vec!["c.json", "b.json"]);
    }

    #[test]
    fn push_older_stops_at_capacity() {
        let mut registry = RecentRegistry::new(2);
        assert!(registry.push_older(record("newest.json", None)));
        assert!(registry.push_older(record("older.json", None)));
        assert!(!registry.push_older(record("oldest.json", None)));

        let refs: Vec<_> = registry.snapshot().iter().map(|r| r.storage_ref.clone()).collect();
        assert_eq!(refs, vec!["newest.json", "older.json"]);
    }

    #[test]
    fn finds_known_message_ids() {
        let mut registry = RecentRegistry::new(4);
        registry.push(record("a.json", Some("msg-1")));
        assert!(registry.contains_message_id("msg-1"));
        assert!(!registry.contains_message_id("msg-2"));
    }

    #[test]
    fn recent_record_serializes_flat() {
        let json = serde_json::to_value(record("a.json", Some("msg-1"))).unwrap();
        assert_eq!(json["storageRef"], "a.json");
        assert_eq!(json["partNumber"], "888-999");
        assert_eq!(json["sourceMessageId"], "msg-1");
    }
}
