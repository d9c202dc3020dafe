//! Startup importer
//!
//! On boot, every entry still sitting in the durable store is replayed
//! into the recent registry (newest-filename-first, truncated at the
//! registry capacity) and through the fan-out bus, so the backlog reaches
//! clients that connect after a restart. Entries whose message id is
//! already registered are skipped; files that fail to parse are logged
//! and left alone.

use crate::registry::RecentRecord;
use crate::state::AppState;
use pcq_common::record::QueueEntry;

pub async fn import_pending(state: &AppState) -> pcq_common::Result<usize> {
    let entries: Vec<(String, QueueEntry)> = {
        let intake = state.intake.lock().await;
        let store = intake.store();
        let mut names = store.file_names()?;
        names.reverse();

        let mut parsed = Vec::with_capacity(names.len());
        for name in names {
            match store.read_entry(&name) {
                Ok(entry) => parsed.push((name, entry)),
                Err(err) => {
                    tracing::warn!(filename = %name, error = %err, "skipping unparsable store entry")
                }
            }
        }
        parsed
    };

    if entries.is_empty() {
        tracing::info!("no pending store entries at startup");
        return Ok(0);
    }

    let mut imported = 0;
    let mut registry = state.registry.lock().await;
    for (storage_ref, entry) in entries {
        if let Some(id) = entry.source_message_id.as_deref() {
            if registry.contains_message_id(id) {
                tracing::debug!(message_id = %id, "already imported, skipping");
                continue;
            }
        }

        let record = RecentRecord { storage_ref, entry };
        if !registry.push_older(record.clone()) {
            break;
        }
        state.events.publish(&record);
        imported += 1;
    }

    tracing::info!(imported, "pending store entries imported at startup");
    Ok(imported)
}
