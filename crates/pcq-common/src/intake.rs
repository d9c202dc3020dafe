//! Shared ingestion pipeline
//!
//! One capability surface — normalize, should-skip, persist — used
//! identically by the server (authoritative store) and the relay
//! (fallback buffer), instead of two parallel reimplementations.
//!
//! [`Intake::submit`] is fully synchronous: callers that share an intake
//! across handlers hold it behind one mutex, so two submissions racing an
//! identical signature converge on a single stored entry and both observe
//! the winner's storage reference.

use crate::dedup::{content_signature, DedupGuard};
use crate::error::Result;
use crate::normalize;
use crate::record::PartRecord;
use crate::store::QueueStore;

/// Outcome of submitting a record through the guard and store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// A new entry was written.
    Stored { storage_ref: String },
    /// The message id was already processed; nothing written.
    DuplicateId,
    /// An identical record was just persisted; its reference is reused.
    DuplicateSignature { storage_ref: String },
}

impl Submission {
    pub fn storage_ref(&self) -> Option<&str> {
        match self {
            Submission::Stored { storage_ref }
            | Submission::DuplicateSignature { storage_ref } => Some(storage_ref),
            Submission::DuplicateId => None,
        }
    }

    pub fn skipped_duplicate(&self) -> bool {
        !matches!(self, Submission::Stored { .. })
    }
}

/// Dedup guard plus queue store for one ingestion role.
#[derive(Debug)]
pub struct Intake {
    guard: DedupGuard,
    store: QueueStore,
}

impl Intake {
    pub fn new(store: QueueStore) -> Self {
        Self::with_guard(store, DedupGuard::new())
    }

    /// Construct with an explicit guard. Tests shrink the TTL windows.
    pub fn with_guard(store: QueueStore, guard: DedupGuard) -> Self {
        Self { guard, store }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    /// Parse raw inbound text into a record.
    pub fn normalize(&self, text: &str) -> Result<PartRecord> {
        normalize::parse_message(text)
    }

    /// Run both guard layers. `Some` means the submission is a duplicate
    /// and must succeed without a write; the message id, when present, is
    /// registered as seen.
    pub fn should_skip(&mut self, record: &PartRecord) -> Option<Submission> {
        if let Some(id) = record.source_message_id.as_deref() {
            if self.guard.is_duplicate_id(id) {
                return Some(Submission::DuplicateId);
            }
        }

        let signature = content_signature(record);
        self.guard
            .recent_ref_for_signature(&signature)
            .map(|storage_ref| Submission::DuplicateSignature { storage_ref })
    }

    /// Write the record and register its signature.
    ///
    /// On a failed write the message id registered by [`Self::should_skip`]
    /// is forgotten again, so a retried delivery is not mistaken for a
    /// replay of a record that never landed.
    pub fn persist(&mut self, record: &PartRecord) -> Result<Submission> {
        match self.store.append(record) {
            Ok(storage_ref) => {
                self.guard
                    .remember_signature(content_signature(record), storage_ref.clone());
                Ok(Submission::Stored { storage_ref })
            }
            Err(err) => {
                if let Some(id) = record.source_message_id.as_deref() {
                    self.guard.forget_id(id);
                }
                Err(err)
            }
        }
    }

    /// Guard check then persist, as one synchronous step.
    pub fn submit(&mut self, record: &PartRecord) -> Result<Submission> {
        if let Some(skip) = self.should_skip(record) {
            return Ok(skip);
        }
        self.persist(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn intake() -> (TempDir, Intake) {
        let dir = TempDir::new().unwrap();
        let intake = Intake::new(QueueStore::new(dir.path()));
        (dir, intake)
    }

    fn record_with_id(part: &str, id: &str) -> PartRecord {
        PartRecord {
            part_number: part.to_string(),
            quantity: Some(4),
            source_message_id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resubmitted_message_id_stores_once() {
        let (_dir, mut intake) = intake();
        let record = record_with_id("888-999", "msg-1");

        let first = intake.submit(&record).unwrap();
        assert!(matches!(first, Submission::Stored { .. }));

        let second = intake.submit(&record).unwrap();
        assert_eq!(second, Submission::DuplicateId);
        assert!(second.skipped_duplicate());
        assert_eq!(intake.store().depth(), 1);
    }

    #[test]
    fn identical_records_without_id_share_one_ref() {
        let (_dir, mut intake) = intake();
        let record = PartRecord::new("888-999", Some(4));

        let first = intake.submit(&record).unwrap();
        let second = intake.submit(&record).unwrap();

        assert_eq!(first.storage_ref(), second.storage_ref());
        assert!(second.skipped_duplicate());
        assert_eq!(intake.store().depth(), 1);
    }

    #[test]
    fn different_records_both_store() {
        let (_dir, mut intake) = intake();
        intake.submit(&PartRecord::new("888-999", Some(4))).unwrap();
        intake.submit(&PartRecord::new("888-999", Some(5))).unwrap();
        assert_eq!(intake.store().depth(), 2);
    }

    #[test]
    fn failed_write_forgets_the_message_id() {
        let dir = TempDir::new().unwrap();
        // A file where the store expects its directory makes writes fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"x").unwrap();
        let mut intake = Intake::new(QueueStore::new(&blocked));

        let record = record_with_id("888-999", "msg-1");
        assert!(intake.submit(&record).is_err());

        // The id is free again, so the retry is not treated as a replay.
        assert_eq!(intake.should_skip(&record), None);
    }

    #[test]
    fn normalize_is_exposed_on_the_intake() {
        let (_dir, intake) = intake();
        let record = intake.normalize("888-999 4pz").unwrap();
        assert_eq!(record.part_number, "888-999");
        assert_eq!(record.quantity, Some(4));
    }
}
