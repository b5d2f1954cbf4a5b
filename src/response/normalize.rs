//! Lenient conversion of model text into an [`Envelope`]
//!
//! Models wrap JSON in prose, fence it in markdown, or skip it entirely.
//! Nothing here returns an error: the worst case is the fallback envelope
//! whose decision is the trimmed raw text.

use serde_json::{Map, Value};

use super::Envelope;

/// Convert any model output into an envelope. Total.
pub fn normalize(raw: &str) -> Envelope {
    parse_structured(raw).unwrap_or_else(|| Envelope::fallback(raw))
}

/// Find a JSON object in `raw`: the whole string first, then the span from
/// the first `{` to the last `}`
pub fn parse_structured(raw: &str) -> Option<Envelope> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) {
        return Some(coerce(map));
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(coerce(map)),
        _ => None,
    }
}

/// Force an arbitrary JSON object into envelope shape
fn coerce(mut map: Map<String, Value>) -> Envelope {
    let messages = match map.remove("messages") {
        Some(Value::Array(items)) => items.into_iter().map(value_to_text).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![value_to_text(other)],
    };

    let artifacts = match map.remove("artifacts") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    };

    let decision = match map.remove("decision") {
        Some(Value::Null) | None => String::new(),
        Some(other) => value_to_text(other),
    };

    let status = match map.remove("status") {
        Some(Value::String(s)) => Some(s),
        _ => None,
    };

    Envelope {
        messages,
        artifacts,
        decision,
        status,
        extra: map,
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
