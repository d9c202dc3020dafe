//! Piece-count record types shared by the server and relay roles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized piece-count submission, not yet persisted.
///
/// Produced either by [`crate::normalize::parse_message`] from raw inbound
/// text or directly from an HTTP submission body. `quantity` is optional:
/// a record without one is in the "pending quantity" state and is still
/// valid for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartRecord {
    /// Non-empty after normalization.
    pub part_number: String,
    pub quantity: Option<u32>,
    /// Base64 data-URI of an attachment. Decoded to a sibling file at
    /// persistence time; never stored inline.
    pub media: Option<String>,
    /// Near-unique id assigned by the producing transport, when it has one.
    pub source_message_id: Option<String>,
    /// Opaque producer identity.
    pub producer_id: Option<String>,
}

impl PartRecord {
    pub fn new(part_number: impl Into<String>, quantity: Option<u32>) -> Self {
        Self {
            part_number: part_number.into(),
            quantity,
            ..Default::default()
        }
    }
}

/// One stored entry in a queue directory.
///
/// The fallback buffer and the authoritative store share this exact schema,
/// so reconciliation requires no translation. Entries are append-only:
/// after the initial write the only permitted mutation is the redaction
/// operation, which nulls `part_number` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Null only after redaction.
    pub part_number: Option<String>,
    pub quantity: Option<u32>,
    pub recorded_at: DateTime<Utc>,
    /// Relative path of the decoded attachment under the store's media
    /// subdirectory, or null.
    pub media: Option<String>,
    pub source_message_id: Option<String>,
    pub producer_id: Option<String>,
}

impl QueueEntry {
    /// Rebuild the minimal submittable record from a stored entry.
    ///
    /// Used by the reconciler to replay buffered entries through the
    /// ingestion API. Media stays local: the stored value is a file path,
    /// not payload bytes.
    pub fn to_part_record(&self) -> Option<PartRecord> {
        let part_number = self.part_number.clone()?;
        Some(PartRecord {
            part_number,
            quantity: self.quantity,
            media: None,
            source_message_id: self.source_message_id.clone(),
            producer_id: self.producer_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_camel_case() {
        let entry = QueueEntry {
            part_number: Some("888-999".to_string()),
            quantity: Some(4),
            recorded_at: Utc::now(),
            media: Some("media/att_x.png".to_string()),
            source_message_id: Some("msg-1".to_string()),
            producer_id: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"partNumber\""));
        assert!(json.contains("\"sourceMessageId\""));

        let back: QueueEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn minimal_record_drops_media_path() {
        let entry = QueueEntry {
            part_number: Some("101-583".to_string()),
            quantity: None,
            recorded_at: Utc::now(),
            media: Some("media/att.png".to_string()),
            source_message_id: None,
            producer_id: Some("relay-1".to_string()),
        };

        let record = entry.to_part_record().unwrap();
        assert_eq!(record.part_number, "101-583");
        assert_eq!(record.media, None);
        assert_eq!(record.producer_id.as_deref(), Some("relay-1"));
    }

    #[test]
    fn redacted_entry_yields_no_record() {
        let entry = QueueEntry {
            part_number: None,
            quantity: Some(2),
            recorded_at: Utc::now(),
            media: None,
            source_message_id: None,
            producer_id: None,
        };
        assert!(entry.to_part_record().is_none());
    }
}
