//! Environment variable version records
//!
//! Append-only history: every mutation of an env var produces one version
//! with a field-level diff and a checksum that can be re-derived from the
//! diff alone. Secret mutations record `***` placeholders instead of real
//! values, so the history never holds plaintext or ciphertext.

use crate::domain::id::{EnvVarId, VersionId};
use crate::domain::masking::MASKED;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One entry in a version diff: either a field change or a semantic marker
/// such as `rotation: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffEntry {
    Change { old: Value, new: Value },
    Marker(Value),
}

impl DiffEntry {
    pub fn change(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self::Change { old: old.into(), new: new.into() }
    }

    pub fn marker(value: impl Into<Value>) -> Self {
        Self::Marker(value.into())
    }

    /// Whether this entry hides its values behind the secret mask
    pub fn is_masked(&self) -> bool {
        matches!(
            self,
            Self::Change { old: Value::String(o), new: Value::String(n) }
                if o == MASKED && n == MASKED
        )
    }
}

/// Field-level diff of one mutation. BTreeMap keeps field ordering stable for
/// checksum derivation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionDiff(pub BTreeMap<String, DiffEntry>);

impl VersionDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field change
    pub fn record(&mut self, field: &str, old: impl Into<Value>, new: impl Into<Value>) {
        self.0.insert(field.to_string(), DiffEntry::change(old, new));
    }

    /// Record a masked change (secret values)
    pub fn record_masked(&mut self, field: &str) {
        self.0.insert(field.to_string(), DiffEntry::change(MASKED, MASKED));
    }

    /// Record a semantic marker
    pub fn mark(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), DiffEntry::marker(value));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&DiffEntry> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DiffEntry)> {
        self.0.iter()
    }

    /// Canonical JSON used for checksum derivation: object keys sorted
    /// recursively so logically equal diffs hash identically.
    pub fn canonical_json(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        canonicalize(&value).to_string()
    }

    /// SHA-256 over the canonical JSON rendering
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_json().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Recursively sort object keys so serialization order is deterministic
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Append-only record of one mutation to an environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVarVersion {
    pub id: VersionId,
    pub env_var_id: EnvVarId,
    /// Monotonically increasing per env var, starting at 1, gap-free
    pub version: i64,
    pub diff: VersionDiff,
    pub checksum: String,
    pub author: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl EnvVarVersion {
    /// Construct a version record, deriving the checksum from the diff
    pub fn new(
        id: VersionId,
        env_var_id: EnvVarId,
        version: i64,
        diff: VersionDiff,
        author: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let checksum = diff.checksum();
        Self { id, env_var_id, version, diff, checksum, author, created_at }
    }

    /// Round-trip law: the stored checksum must equal one recomputed from
    /// the diff content.
    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.diff.checksum()
    }

    /// Human-readable summary of the recorded changes
    pub fn diff_summary(&self) -> String {
        let mut parts = Vec::with_capacity(self.diff.0.len());
        for (field, entry) in self.diff.iter() {
            match entry {
                DiffEntry::Change { old, new } => {
                    parts.push(format!("{}: {} -> {}", field, old, new));
                }
                DiffEntry::Marker(value) => parts.push(format!("{}: {}", field, value)),
            }
        }
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn version_with(diff: VersionDiff) -> EnvVarVersion {
        EnvVarVersion::new(
            VersionId::new(),
            EnvVarId::new(),
            1,
            diff,
            "author".into(),
            Utc::now(),
        )
    }

    #[test]
    fn checksum_round_trip() {
        let mut diff = VersionDiff::new();
        diff.record("description", json!(null), json!("primary database"));
        let version = version_with(diff);
        assert!(version.verify_checksum());
    }

    #[test]
    fn checksum_detects_tampering() {
        let mut diff = VersionDiff::new();
        diff.record("value", "old", "new");
        let mut version = version_with(diff);
        version.checksum = "0000".into();
        assert!(!version.verify_checksum());
    }

    #[test]
    fn checksum_stable_across_insertion_order() {
        let mut a = VersionDiff::new();
        a.record("value", "1", "2");
        a.record("description", json!(null), json!("d"));

        let mut b = VersionDiff::new();
        b.record("description", json!(null), json!("d"));
        b.record("value", "1", "2");

        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn masked_entry_detection() {
        let mut diff = VersionDiff::new();
        diff.record_masked("value");
        diff.mark("rotation", true);
        assert!(diff.get("value").unwrap().is_masked());
        assert!(!diff.get("rotation").unwrap().is_masked());
    }

    #[test]
    fn diff_serialization_shape() {
        let mut diff = VersionDiff::new();
        diff.record("value", "a", "b");
        diff.mark("rotation", true);
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json["value"]["old"], "a");
        assert_eq!(json["value"]["new"], "b");
        assert_eq!(json["rotation"], true);
    }

    #[test]
    fn diff_deserialization_round_trip() {
        let mut diff = VersionDiff::new();
        diff.record("tags", json!(["a"]), json!(["a", "b"]));
        diff.mark("rotation", true);
        let text = serde_json::to_string(&diff).unwrap();
        let parsed: VersionDiff = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, diff);
    }

    #[test]
    fn summary_mentions_fields() {
        let mut diff = VersionDiff::new();
        diff.record("description", json!("old"), json!("new"));
        let version = version_with(diff);
        assert!(version.diff_summary().contains("description"));
    }
}
