//! PCQ Relay
//!
//! The producer-side process: consumes an inbound message source,
//! normalizes piece-count messages, submits them to the ingestion API,
//! buffers into the local fallback cache when the API is unreachable, and
//! reconciles the buffer on a fixed interval.

pub mod client;
pub mod reconciler;
pub mod source;
pub mod submit;
