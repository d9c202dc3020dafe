//! Dual-layer duplicate suppression
//!
//! Two independent guards, both required:
//!
//! - **Message-id dedup** defends against retried deliveries of the same
//!   logical event. TTL 5 minutes.
//! - **Content-signature dedup** defends against near-simultaneous
//!   duplicate submissions that carry no stable id, e.g. a direct write
//!   racing a fallback write. TTL 15 seconds; a hit returns the storage
//!   reference the winner was assigned.
//!
//! Both maps are lazily swept on every check.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::record::PartRecord;

/// How long a message id suppresses replays.
pub const MESSAGE_ID_TTL: Duration = Duration::from_secs(5 * 60);

/// How long a content signature suppresses near-duplicates.
pub const SIGNATURE_TTL: Duration = Duration::from_secs(15);

/// Only this many leading bytes of the media payload feed the signature.
/// Two different attachments sharing the prefix (with identical part and
/// quantity, inside the TTL window) collide; tolerated, not fixed.
const MEDIA_SIGNATURE_PREFIX: usize = 80;

/// Compute the content signature for a record without a usable message id.
pub fn content_signature(record: &PartRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.part_number.as_bytes());
    hasher.update(b"|");
    match record.quantity {
        Some(q) => hasher.update(q.to_string().as_bytes()),
        None => hasher.update(b"-"),
    }
    hasher.update(b"|");
    match record.media.as_deref() {
        Some(media) => {
            let bytes = media.as_bytes();
            hasher.update(b"IMG:");
            hasher.update(&bytes[..bytes.len().min(MEDIA_SIGNATURE_PREFIX)]);
        }
        None => hasher.update(b"NOIMG"),
    }
    hex::encode(hasher.finalize())
}

/// Short-window duplicate suppression state.
#[derive(Debug)]
pub struct DedupGuard {
    id_ttl: Duration,
    signature_ttl: Duration,
    seen_ids: HashMap<String, Instant>,
    seen_signatures: HashMap<String, SignatureEntry>,
}

#[derive(Debug)]
struct SignatureEntry {
    storage_ref: String,
    seen_at: Instant,
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::with_ttls(MESSAGE_ID_TTL, SIGNATURE_TTL)
    }

    /// Construct with explicit windows. Tests shrink these.
    pub fn with_ttls(id_ttl: Duration, signature_ttl: Duration) -> Self {
        Self {
            id_ttl,
            signature_ttl,
            seen_ids: HashMap::new(),
            seen_signatures: HashMap::new(),
        }
    }

    /// Check and register a message id in one step.
    ///
    /// Returns true when the id was already seen inside the TTL window,
    /// meaning the submission is a logical replay and must succeed
    /// without a new write.
    pub fn is_duplicate_id(&mut self, message_id: &str) -> bool {
        let now = Instant::now();
        let ttl = self.id_ttl;
        self.seen_ids.retain(|_, seen_at| now.duration_since(*seen_at) <= ttl);

        if self.seen_ids.contains_key(message_id) {
            return true;
        }
        self.seen_ids.insert(message_id.to_string(), now);
        false
    }

    /// Drop a registered message id.
    ///
    /// Called when the write that followed the id check failed, so a
    /// retried delivery is not mistaken for a replay.
    pub fn forget_id(&mut self, message_id: &str) {
        self.seen_ids.remove(message_id);
    }

    /// Storage reference of a recently persisted identical record, if any.
    pub fn recent_ref_for_signature(&mut self, signature: &str) -> Option<String> {
        let now = Instant::now();
        let ttl = self.signature_ttl;
        self.seen_signatures
            .retain(|_, entry| now.duration_since(entry.seen_at) <= ttl);

        self.seen_signatures
            .get(signature)
            .map(|entry| entry.storage_ref.clone())
    }

    /// Register the storage reference assigned to a signature.
    pub fn remember_signature(&mut self, signature: String, storage_ref: String) {
        self.seen_signatures.insert(
            signature,
            SignatureEntry {
                storage_ref,
                seen_at: Instant::now(),
            },
        );
    }
}
