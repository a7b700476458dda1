//! Response decoder.
//!
//! Parses a raw body into structured JSON. Failure is a value, not an error:
//! the raw bytes stay attached so the final message can show what the
//! gateway actually sent.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    Json(Value),
    Invalid { error: String, raw: Vec<u8> },
}

impl DecodedBody {
    pub fn is_json(&self) -> bool {
        matches!(self, DecodedBody::Json(_))
    }

    /// Raw body rendered as text for inclusion in diagnostics.
    pub fn raw_text(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// Only objects and arrays count as structured; a bare scalar such as `"ok"`
/// or `1` from a plain-text endpoint is treated as undecodable.
pub fn decode(raw: &[u8]) -> DecodedBody {
    match serde_json::from_slice::<Value>(raw) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => DecodedBody::Json(value),
        Ok(_) => DecodedBody::Invalid {
            error: "expected a JSON object or array".to_string(),
            raw: raw.to_vec(),
        },
        Err(err) => DecodedBody::Invalid {
            error: err.to_string(),
            raw: raw.to_vec(),
        },
    }
}
