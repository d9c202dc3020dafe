//! PCQ Common Library
//!
//! Shared types and ingestion primitives for the piece-count queue.
//!
//! # Overview
//!
//! This crate provides the pieces used identically by the server and relay
//! roles:
//!
//! - **Records**: the normalized piece-count record and its stored form
//! - **Normalization**: raw message text into a [`record::PartRecord`]
//! - **Deduplication**: message-id and content-signature TTL guards
//! - **Storage**: the append-only per-record file store
//! - **Backup tiers**: secondary backup record and emergency log
//!
//! # Example
//!
//! ```no_run
//! use pcq_common::intake::Intake;
//! use pcq_common::normalize;
//!
//! fn ingest(intake: &mut Intake, text: &str) -> pcq_common::Result<()> {
//!     let record = normalize::parse_message(text)?;
//!     let outcome = intake.submit(&record)?;
//!     println!("stored as {:?}", outcome.storage_ref());
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod dedup;
pub mod error;
pub mod intake;
pub mod logging;
pub mod normalize;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use error::{PcqError, Result};
