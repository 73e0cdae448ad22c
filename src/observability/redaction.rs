//! Structural redaction of log payloads.

use serde_json::Value;

/// Replacement for any sensitive value.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments that mark a field as sensitive. Keys are lowercased and
/// stripped of `_`, `-` and spaces before matching.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "apikey",
    "privatekey",
    "authorization",
    "cookie",
    "phone",
    "msisdn",
    "transactionid",
    "checkoutrequestid",
    "merchantrequestid",
    "receiptnumber",
    "cardnumber",
    "cvv",
];

/// True when `key` names a sensitive field.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_FIELDS
        .iter()
        .any(|field| normalized.contains(field))
}

/// A redacted copy of `value`.
pub fn redact(value: &Value) -> Value {
    let mut copy = value.clone();
    redact_in_place(&mut copy);
    copy
}

/// Replace every sensitive field's value with [`REDACTED`], at any depth.
///
/// A matched key is replaced wholesale, whatever its value's shape.
pub fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact_in_place(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_in_place),
        _ => {}
    }
}
