//! Shared masking utility for sensitive values
//!
//! Both the audit trail and the env var entity render sensitive material
//! through this module so that the set of masked field names lives in exactly
//! one place.

use serde_json::Value;

/// The fixed mask rendered in place of any sensitive value
pub const MASKED: &str = "***";

/// Field names whose values are always masked in outward renderings
pub const SENSITIVE_FIELDS: &[&str] = &["value", "password", "secret", "token", "key"];

/// Return a copy of `data` with sensitive fields masked, recursing through
/// nested objects and arrays.
pub fn mask_sensitive(data: &Value) -> Value {
    match data {
        Value::Object(map) => {
            let mut masked = serde_json::Map::with_capacity(map.len());
            for (field, value) in map {
                if SENSITIVE_FIELDS.contains(&field.as_str()) {
                    masked.insert(field.clone(), Value::String(MASKED.to_string()));
                } else {
                    masked.insert(field.clone(), mask_sensitive(value));
                }
            }
            Value::Object(masked)
        }
        Value::Array(items) => Value::Array(items.iter().map(mask_sensitive).collect()),
        other => other.clone(),
    }
}
