//! Inbound message source
//!
//! The message transport itself is an external collaborator; here it is
//! modelled as a bounded channel of [`InboundMessage`] events. The shipped
//! source reads JSON-lines from stdin, one message per line, and forwards
//! them into the channel without blocking on downstream processing. A
//! single consumer task (see [`crate::submit`]) drains the channel in
//! order, preserving per-sender ordering.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Depth of the source-to-consumer channel.
pub const DEFAULT_CHANNEL_DEPTH: usize = 256;

/// One event from the inbound transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub text: String,
    /// Base64 data-URI of an attached image, when the event carried one.
    #[serde(default)]
    pub media: Option<String>,
    /// Transport-assigned near-unique id.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Opaque sender identity.
    #[serde(default)]
    pub origin: Option<String>,
}

/// Origin allow-list: a JSON object mapping origin id to a display name.
/// Missing or empty means every origin is allowed.
#[derive(Debug, Default)]
pub struct OriginFilter {
    allowed: HashMap<String, String>,
}

impl OriginFilter {
    pub fn from_map(allowed: HashMap<String, String>) -> Self {
        Self { allowed }
    }

    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(allowed) => {
                    let filter = Self { allowed };
                    tracing::info!(
                        origins = filter.allowed.len(),
                        "origin filter active"
                    );
                    filter
                }
                Err(err) => {
                    tracing::warn!(error = %err, path = %path.display(), "origin file unparsable, allowing all");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "origin file unreadable, allowing all");
                Self::default()
            }
        }
    }

    pub fn permits(&self, origin: Option<&str>) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        origin.is_some_and(|o| self.allowed.contains_key(o))
    }
}

/// Forward stdin JSON-lines into the channel until EOF or a closed
/// receiver. Unparsable lines are logged and dropped; they never stall
/// the transport.
pub async fn read_stdin(tx: mpsc::Sender<InboundMessage>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<InboundMessage>(line) {
                    Ok(message) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "unparsable inbound line dropped");
                    }
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::error!(error = %err, "inbound source read failed");
                break;
            }
        }
    }
    tracing::info!("inbound source closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_allows_everything() {
        let filter = OriginFilter::default();
        assert!(filter.permits(Some("anyone")));
        assert!(filter.permits(None));
    }

    #[test]
    fn populated_filter_requires_known_origin() {
        let filter = OriginFilter::from_map(HashMap::from([(
            "line-a".to_string(),
            "Line A".to_string(),
        )]));
        assert!(filter.permits(Some("line-a")));
        assert!(!filter.permits(Some("line-b")));
        assert!(!filter.permits(None));
    }

    #[test]
    fn messages_deserialize_with_optional_fields() {
        let message: InboundMessage =
            serde_json::from_str(r#"{"text": "888-999 4pz", "messageId": "m1"}"#).unwrap();
        assert_eq!(message.text, "888-999 4pz");
        assert_eq!(message.message_id.as_deref(), Some("m1"));
        assert_eq!(message.media, None);
        assert_eq!(message.origin, None);
    }
}
