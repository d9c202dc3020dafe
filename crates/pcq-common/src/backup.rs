//! Failsafe persistence tiers
//!
//! When the primary queue store is unwritable, a validated record falls
//! through two progressively more primitive tiers:
//!
//! 1. a secondary backup file holding an array of rows, updated in place
//!    when the part number already has a row
//! 2. an append-only emergency log line
//!
//! Each tier logs the failure of the one above it. Capturing never returns
//! an error to the caller: only invalid input is ever dropped, and that
//! happens before persistence is attempted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::record::PartRecord;

const BACKUP_FILE: &str = "backup_records.json";
const EMERGENCY_FILE: &str = "emergency.log";

/// Which tier finally took the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupTier {
    /// Stored in the secondary backup file at this path.
    Secondary(String),
    /// Only the emergency log line was written.
    Emergency,
    /// Every tier failed; the loss is logged, nothing else can be done.
    Lost,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupRow {
    order_num: usize,
    part_number: String,
    quantity: Option<u32>,
    has_media: bool,
    recorded_at: String,
}

/// Sink for records the primary store rejected.
#[derive(Debug, Clone)]
pub struct BackupSink {
    dir: PathBuf,
}

impl BackupSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Run the failsafe chain for one record.
    pub fn capture(&self, record: &PartRecord) -> BackupTier {
        match self.write_secondary(record) {
            Ok(path) => {
                tracing::warn!(part = %record.part_number, path = %path, "record captured in secondary backup");
                BackupTier::Secondary(path)
            }
            Err(err) => {
                tracing::error!(part = %record.part_number, error = %err, "secondary backup failed, falling to emergency log");
                self.write_emergency(record)
            }
        }
    }

    fn write_secondary(&self, record: &PartRecord) -> std::io::Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(BACKUP_FILE);

        let mut rows: Vec<BackupRow> = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        let recorded_at = Utc::now().to_rfc3339();
        match rows.iter_mut().find(|row| row.part_number == record.part_number) {
            Some(row) => {
                row.quantity = record.quantity;
                row.has_media = record.media.is_some();
                row.recorded_at = recorded_at;
            }
            None => rows.push(BackupRow {
                order_num: rows.len() + 1,
                part_number: record.part_number.clone(),
                quantity: record.quantity,
                has_media: record.media.is_some(),
                recorded_at,
            }),
        }

        let json = serde_json::to_string_pretty(&rows)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(&path, json)?;
        Ok(path.display().to_string())
    }

    fn write_emergency(&self, record: &PartRecord) -> BackupTier {
        let quantity = record
            .quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "PENDING".to_string());
        let line = format!(
            "{} - {} - {} pieces - {}\n",
            Utc::now().to_rfc3339(),
            record.part_number,
            quantity,
            if record.media.is_some() { "WITH MEDIA" } else { "NO MEDIA" },
        );

        let write = std::fs::create_dir_all(&self.dir).and_then(|_| {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(EMERGENCY_FILE))?;
            file.write_all(line.as_bytes())
        });

        match write {
            Ok(()) => {
                tracing::warn!(part = %record.part_number, "record captured in emergency log");
                BackupTier::Emergency
            }
            Err(err) => {
                tracing::error!(part = %record.part_number, error = %err, "emergency log unwritable, record lost");
                BackupTier::Lost
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(part: &str, quantity: Option<u32>) -> PartRecord {
        PartRecord::new(part, quantity)
    }

    #[test]
    fn first_capture_creates_backup_row() {
        let dir = TempDir::new().unwrap();
        let sink = BackupSink::new(dir.path());

        let tier = sink.capture(&record("888-999", Some(4)));
        assert!(matches!(tier, BackupTier::Secondary(_)));

        let raw = std::fs::read_to_string(dir.path().join(BACKUP_FILE)).unwrap();
        let rows: Vec<BackupRow> = serde_json::from_str(&raw).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].part_number, "888-999");
        assert_eq!(rows[0].quantity, Some(4));
    }

    #[test]
    fn repeat_part_updates_row_in_place() {
        let dir = TempDir::new().unwrap();
        let sink = BackupSink::new(dir.path());

        sink.capture(&record("888-999", Some(4)));
        sink.capture(&record("888-999", Some(9)));
        sink.capture(&record("101-583", None));

        let raw = std::fs::read_to_string(dir.path().join(BACKUP_FILE)).unwrap();
        let rows: Vec<BackupRow> = serde_json::from_str(&raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].quantity, Some(9));
        assert_eq!(rows[1].part_number, "101-583");
    }

    #[test]
    fn corrupt_backup_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(BACKUP_FILE), "{not json").unwrap();
        let sink = BackupSink::new(dir.path());

        let tier = sink.capture(&record("888-999", Some(4)));
        assert!(matches!(tier, BackupTier::Secondary(_)));
    }
}
