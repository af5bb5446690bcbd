//! Provider error conventions.
//!
//! Many finance APIs answer 200 with `{"Error Message": ...}` or
//! `{"error": ...}`, and error bodies put the text under varying keys. The
//! key lists come from [`FetchConfig`](super::FetchConfig) so new providers
//! need no code changes.

use serde_json::Value;

/// JS-style truthiness: null, false, 0, NaN and "" are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render an error value as message text.
fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(s)) => s.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

/// The message of an error embedded in a 2xx payload, if any.
pub fn embedded_error(payload: &Value, keys: &[String]) -> Option<String> {
    let map = payload.as_object()?;
    keys.iter()
        .filter_map(|k| map.get(k))
        .find(|v| is_truthy(v))
        .map(message_text)
}

/// Best message for a non-2xx response.
///
/// JSON bodies are searched with `keys`; a bare JSON string is used as-is.
/// Otherwise the trimmed text, then the canonical reason, then a generic line.
pub fn error_message(status: u16, body: &str, keys: &[String]) -> String {
    let fallback = || format!("HTTP error! status: {}", status);

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Value::String(s) = &json {
            return s.clone();
        }
        return json
            .as_object()
            .and_then(|map| keys.iter().filter_map(|k| map.get(k)).find(|v| is_truthy(v)))
            .map(message_text)
            .unwrap_or_else(fallback);
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.chars().take(500).collect();
    }

    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(fallback)
}
