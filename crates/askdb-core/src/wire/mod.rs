//! Transcript wire format
//!
//! Converts a transcript to a transport-safe representation (plain JSON
//! value or string, no opaque handles) for handoff across a process or
//! network boundary, and parses it back. Turn order and block order are
//! preserved exactly; serialize-then-parse yields a structurally equal
//! transcript.

use serde_json::Value;
use thiserror::Error;

use crate::types::Turn;

/// Errors crossing the transcript wire boundary
#[derive(Debug, Error)]
pub enum WireError {
    /// A transcript could not be encoded
    #[error("Failed to encode transcript: {0}")]
    Encode(serde_json::Error),

    /// The received representation is not a well-formed transcript
    #[error("Malformed transcript: {0}")]
    Decode(serde_json::Error),
}

pub type WireResult<T> = Result<T, WireError>;

/// Encode a transcript as a plain JSON value
pub fn to_value(turns: &[Turn]) -> WireResult<Value> {
    serde_json::to_value(turns).map_err(WireError::Encode)
}

/// Parse a transcript from a plain JSON value
pub fn from_value(value: Value) -> WireResult<Vec<Turn>> {
    serde_json::from_value(value).map_err(WireError::Decode)
}

/// Encode a transcript as a JSON string
pub fn to_json(turns: &[Turn]) -> WireResult<String> {
    serde_json::to_string(turns).map_err(WireError::Encode)
}

/// Parse a transcript from a JSON string
pub fn from_json(json: &str) -> WireResult<Vec<Turn>> {
    serde_json::from_str(json).map_err(WireError::Decode)
}
