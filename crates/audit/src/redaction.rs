//! Scrubs credentials out of request payloads before they are persisted.

use serde_json::Value as JsonValue;

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "api_key",
    "apikey",
    "authorization",
    "access_token",
    "refresh_token",
];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

/// Replace the value of every sensitive key, at any depth.
pub fn redact_json_value(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive(key) {
                    *v = JsonValue::String(REDACTED.to_string());
                } else {
                    redact_json_value(v);
                }
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(redact_json_value),
        _ => {}
    }
}
