//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default queue directory (the durable store).
pub const DEFAULT_QUEUE_DIR: &str = "./queue";

/// Default directory for the failsafe backup tiers.
pub const DEFAULT_BACKUP_DIR: &str = "./backup";

/// Default request body limit; media arrives as base64 data-URIs.
pub const DEFAULT_MAX_BODY_BYTES: usize = 30 * 1024 * 1024;

/// Default cap on concurrent SSE subscribers.
pub const DEFAULT_MAX_SSE_CLIENTS: usize = 200;

/// Default capacity of the in-memory recent-record registry.
pub const DEFAULT_RECENT_CAPACITY: usize = 20;

/// How long after a producer's last submission /status reports it live.
pub const PRODUCER_LIVENESS_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub queue_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub max_body_bytes: usize,
    pub max_sse_clients: usize,
    pub recent_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            queue_dir: PathBuf::from(DEFAULT_QUEUE_DIR),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_sse_clients: DEFAULT_MAX_SSE_CLIENTS,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: std::env::var("PCQ_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            port: std::env::var("PCQ_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            queue_dir: std::env::var("PCQ_QUEUE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_QUEUE_DIR)),
            backup_dir: std::env::var("PCQ_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BACKUP_DIR)),
            max_body_bytes: std::env::var("PCQ_MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_BYTES),
            max_sse_clients: std::env::var("PCQ_MAX_SSE_CLIENTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_SSE_CLIENTS),
            recent_capacity: std::env::var("PCQ_RECENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RECENT_CAPACITY),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.max_body_bytes == 0 {
            anyhow::bail!("Body limit must be greater than 0");
        }

        if self.recent_capacity == 0 {
            anyhow::bail!("Recent-registry capacity must be greater than 0");
        }

        if self.max_sse_clients == 0 {
            anyhow::bail!("SSE client cap must be greater than 0");
        }

        Ok(())
    }
}
