//! Record normalization
//!
//! Extracts a part number and optional quantity from raw inbound message
//! text. The part number is two three-digit groups joined by a dash, with
//! an optional `-ZP` suffix tag; the quantity is the first integer run
//! after the part-number match (`"888-999 4pz"`, `"101-583---4PZ"`).
//! A missing quantity is valid and leaves the record in the pending
//! quantity state; a missing part number is a format error.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{PcqError, Result};
use crate::record::PartRecord;

static PART_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{3}-\d{3}(?:-ZP)?)").expect("valid part pattern"));

static QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{3}-\d{3}(?:-ZP)?\D*(\d+)").expect("valid quantity pattern"));

/// True when the text contains something shaped like a part number.
///
/// Used by the inbound consumer to ignore unrelated chatter before
/// attempting normalization.
pub fn looks_like_record(text: &str) -> bool {
    PART_NUMBER.is_match(text)
}

/// Parse raw message text into a normalized [`PartRecord`].
///
/// Fails with [`PcqError::Format`] when no part-number pattern matches.
/// Never fails on a missing quantity.
pub fn parse_message(text: &str) -> Result<PartRecord> {
    let part_number = PART_NUMBER
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| {
            PcqError::Format(format!(
                "no part number found in message, expected e.g. \"888-999 4pz\": {text:?}"
            ))
        })?;

    let quantity = QUANTITY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    Ok(PartRecord::new(part_number, quantity))
}
