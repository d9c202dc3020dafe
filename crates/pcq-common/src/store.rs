//! Durable queue store
//!
//! Authoritative append-only persistence: one JSON file per record, named
//! by a sortable UTC timestamp plus the sanitized part number, so a plain
//! name sort is chronological. Embedded data-URI media is decoded exactly
//! once into a `media/` subdirectory and the entry keeps only the relative
//! path. The relay's fallback buffer is the same store type pointed at a
//! different directory.
//!
//! Write failures always propagate to the caller so a fallback tier can
//! engage; nothing here swallows them.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::error::{PcqError, Result};
use crate::record::{PartRecord, QueueEntry};

/// Subdirectory for decoded attachments.
pub const MEDIA_DIR: &str = "media";

const RECORD_PREFIX: &str = "record_";
const MEDIA_PREFIX: &str = "att_";

/// One entry as returned by the list operation. `content` is the parsed
/// entry, or the raw text when a file on disk is not valid JSON.
#[derive(Debug, Serialize)]
pub struct Listing {
    pub filename: String,
    pub content: serde_json::Value,
}

/// A flat directory of per-record JSON files.
#[derive(Debug, Clone)]
pub struct QueueStore {
    dir: PathBuf,
}

impl QueueStore {
    /// Open a store rooted at `dir`. The directory is created lazily on
    /// first write, so opening never fails on an unreachable path.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write-and-delete a probe file to confirm the directory is usable.
    pub fn probe_writable(&self) -> Result<()> {
        self.ensure_dir(&self.dir)?;
        let probe = self.dir.join(".perm_probe");
        std::fs::write(&probe, b"ok")
            .map_err(|e| storage_err("probe write failed", &self.dir, e))?;
        std::fs::remove_file(&probe)
            .map_err(|e| storage_err("probe cleanup failed", &self.dir, e))?;
        Ok(())
    }

    /// Persist a record, returning the assigned storage reference (the
    /// entry's filename).
    pub fn append(&self, record: &PartRecord) -> Result<String> {
        self.ensure_dir(&self.dir)?;

        let now = Utc::now();
        let stamp = now
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace(':', "-");
        let safe_part = sanitize_part(&record.part_number);

        let media_ref = match record.media.as_deref() {
            Some(media) if media.starts_with("data:") => {
                self.write_media(media, &stamp, &safe_part)?
            }
            // Already a reference (fallback entries round-trip their path).
            Some(other) => Some(other.to_string()),
            None => None,
        };

        let entry = QueueEntry {
            part_number: Some(record.part_number.clone()),
            quantity: record.quantity,
            recorded_at: now,
            media: media_ref,
            source_message_id: record.source_message_id.clone(),
            producer_id: record.producer_id.clone(),
        };

        let (filename, path) = self.unique_entry_path(&stamp, &safe_part);
        let json = serde_json::to_string_pretty(&entry)?;
        std::fs::write(&path, json).map_err(|e| storage_err("entry write failed", &path, e))?;

        tracing::debug!(filename = %filename, part = %record.part_number, "queue entry written");
        Ok(filename)
    }

    /// Every stored entry, name-sorted (chronological).
    pub fn list(&self) -> Result<Vec<Listing>> {
        let mut listings = Vec::new();
        for filename in self.file_names()? {
            let raw = std::fs::read_to_string(self.dir.join(&filename))
                .map_err(|e| storage_err("entry read failed", &self.dir.join(&filename), e))?;
            let content = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
            listings.push(Listing { filename, content });
        }
        Ok(listings)
    }

    /// Entry filenames, name-sorted ascending.
    pub fn file_names(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for dirent in std::fs::read_dir(&self.dir)
            .map_err(|e| storage_err("queue dir unreadable", &self.dir, e))?
        {
            let dirent = dirent.map_err(|e| storage_err("queue dir unreadable", &self.dir, e))?;
            let name = dirent.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Number of stored entries.
    pub fn depth(&self) -> usize {
        self.file_names().map(|names| names.len()).unwrap_or(0)
    }

    /// Parse one stored entry.
    pub fn read_entry(&self, filename: &str) -> Result<QueueEntry> {
        let path = self.entry_path(filename)?;
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| PcqError::NotFound(filename.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Raw file bytes for serving an entry over HTTP.
    pub fn read_raw(&self, filename: &str) -> Result<Vec<u8>> {
        let safe = basename(filename);
        let path = self.dir.join(safe);
        std::fs::read(&path).map_err(|_| PcqError::NotFound(safe.to_string()))
    }

    /// Delete a stored entry. Only the fallback tier does this, after the
    /// remote side confirmed acceptance.
    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.entry_path(filename)?;
        std::fs::remove_file(&path).map_err(|e| storage_err("entry delete failed", &path, e))
    }

    /// Null the `partNumber` field of the named entry in place, preserving
    /// every other field. Path traversal is defeated by reducing the input
    /// to its basename first.
    pub fn redact_part(&self, filename: &str) -> Result<String> {
        let safe = basename(filename);
        if !safe.ends_with(".json") {
            return Err(PcqError::Format(format!("not a queue entry file: {safe}")));
        }

        let path = self.dir.join(safe);
        let raw = std::fs::read_to_string(&path)
            .map_err(|_| PcqError::NotFound(safe.to_string()))?;
        let mut value: serde_json::Value = serde_json::from_str(&raw)?;

        if let Some(obj) = value.as_object_mut() {
            if obj.contains_key("partNumber") {
                obj.insert("partNumber".to_string(), serde_json::Value::Null);
            }
        }

        let json = serde_json::to_string_pretty(&value)?;
        std::fs::write(&path, json).map_err(|e| storage_err("redaction write failed", &path, e))?;

        tracing::info!(filename = %safe, "part number redacted");
        Ok(safe.to_string())
    }

    fn entry_path(&self, filename: &str) -> Result<PathBuf> {
        let safe = basename(filename);
        let path = self.dir.join(safe);
        if !path.exists() {
            return Err(PcqError::NotFound(safe.to_string()));
        }
        Ok(path)
    }

    fn unique_entry_path(&self, stamp: &str, safe_part: &str) -> (String, PathBuf) {
        let mut filename = format!("{RECORD_PREFIX}{stamp}_{safe_part}.json");
        let mut path = self.dir.join(&filename);
        let mut bump = 0;
        while path.exists() {
            bump += 1;
            filename = format!("{RECORD_PREFIX}{stamp}_{safe_part}-{bump}.json");
            path = self.dir.join(&filename);
        }
        (filename, path)
    }

    fn write_media(&self, data_uri: &str, stamp: &str, safe_part: &str) -> Result<Option<String>> {
        let Some((ext, bytes)) = decode_data_uri(data_uri) else {
            tracing::warn!(part = %safe_part, "unrecognized media data-URI, storing without media");
            return Ok(None);
        };

        let media_dir = self.dir.join(MEDIA_DIR);
        self.ensure_dir(&media_dir)?;

        let media_name = format!("{MEDIA_PREFIX}{stamp}_{safe_part}.{ext}");
        let media_path = media_dir.join(&media_name);
        std::fs::write(&media_path, bytes)
            .map_err(|e| storage_err("media write failed", &media_path, e))?;

        Ok(Some(format!("{MEDIA_DIR}/{media_name}")))
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| storage_err("directory unavailable", dir, e))
    }
}

fn storage_err(context: &str, path: &Path, err: impl Display) -> PcqError {
    PcqError::Storage(format!("{context}: {}: {err}", path.display()))
}

fn basename(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
}

/// Keep letters, digits and dashes; everything else becomes `_`.
fn sanitize_part(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Split a `data:<mime>;base64,<payload>` URI into an extension and bytes.
fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let subtype = mime.split('/').nth(1).unwrap_or("bin");
    let ext = subtype.split('+').next().unwrap_or("bin");
    let bytes = BASE64.decode(payload).ok()?;
    Some((ext.to_string(), bytes))
}
