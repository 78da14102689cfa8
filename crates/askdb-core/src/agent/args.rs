//! Lenient tool-argument normalization
//!
//! Some tools hand structured values through the reasoning engine as
//! serialized strings (a tool returns a JSON string, the engine feeds it to
//! the next tool's object-typed parameter verbatim). Before dispatch, each
//! top-level string value of an object-shaped argument map whose first
//! non-whitespace character is `{` is decoded back to its structural form.
//!
//! The leniency is deliberate and narrow: decode failure passes the raw
//! string through unchanged, arrays are not sniffed, and nested values are
//! never rewritten.

use serde_json::Value;

/// Normalize a tool-call argument payload before dispatch
pub fn normalize_arguments(arguments: Value) -> Value {
    match arguments {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, decode_embedded_object(value)))
                .collect(),
        ),
        other => other,
    }
}

/// Decode a string that looks like a serialized object; pass through otherwise
fn decode_embedded_object(value: Value) -> Value {
    if let Value::String(s) = &value {
        if s.trim_start().starts_with('{') {
            if let Ok(decoded) = serde_json::from_str::<Value>(s) {
                return decoded;
            }
        }
    }
    value
}
