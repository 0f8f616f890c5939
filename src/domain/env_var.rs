//! Environment variable domain entity
//!
//! The scoped key/value record at the heart of the system, together with the
//! validation rules every construction and mutation must re-run: key format,
//! value size, type-format conformance, and the masking rule for secrets.

use crate::domain::id::EnvVarId;
use crate::domain::masking::MASKED;
use crate::errors::{EnvkeepError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Key pattern every environment variable must match
static KEY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_]{1,100}$").expect("static key regex"));

/// Maximum encoded value size in bytes (1 MiB)
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Scope levels for environment variables, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeLevel {
    Global,
    Project,
    Service,
    Env,
}

impl ScopeLevel {
    /// Get the store representation of this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "GLOBAL",
            Self::Project => "PROJECT",
            Self::Service => "SERVICE",
            Self::Env => "ENV",
        }
    }
}

impl FromStr for ScopeLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GLOBAL" => Ok(Self::Global),
            "PROJECT" => Ok(Self::Project),
            "SERVICE" => Ok(Self::Service),
            "ENV" => Ok(Self::Env),
            _ => Err(format!("Unknown scope level: {}", s)),
        }
    }
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scope reference: a level plus the concrete id it points at
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeRef {
    pub level: ScopeLevel,
    pub ref_id: String,
}

impl ScopeRef {
    pub fn new(level: ScopeLevel, ref_id: impl Into<String>) -> Self {
        Self { level, ref_id: ref_id.into() }
    }

    /// GLOBAL scope with the conventional "default" reference
    pub fn global() -> Self {
        Self::new(ScopeLevel::Global, "default")
    }

    /// ENV scope for a named environment
    pub fn env(name: impl Into<String>) -> Self {
        Self::new(ScopeLevel::Env, name)
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level, self.ref_id)
    }
}

/// Declared value types for environment variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarType {
    String,
    Number,
    Bool,
    Json,
    Secret,
}

impl EnvVarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Bool => "BOOL",
            Self::Json => "JSON",
            Self::Secret => "SECRET",
        }
    }
}

impl FromStr for EnvVarType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "STRING" => Ok(Self::String),
            "NUMBER" => Ok(Self::Number),
            "BOOL" => Ok(Self::Bool),
            "JSON" => Ok(Self::Json),
            "SECRET" => Ok(Self::Secret),
            _ => Err(format!("Unknown env var type: {}", s)),
        }
    }
}

impl fmt::Display for EnvVarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvVarStatus {
    Active,
    Pending,
    Deprecated,
}

impl EnvVarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Pending => "PENDING",
            Self::Deprecated => "DEPRECATED",
        }
    }
}

impl FromStr for EnvVarStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "PENDING" => Ok(Self::Pending),
            "DEPRECATED" => Ok(Self::Deprecated),
            _ => Err(format!("Unknown env var status: {}", s)),
        }
    }
}

impl fmt::Display for EnvVarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validate a raw value against a declared type's format.
///
/// For secrets this must run against the plaintext before encryption; the
/// stored ciphertext is exempt from format checks.
pub fn validate_value_format(var_type: EnvVarType, value: &str) -> Result<()> {
    match var_type {
        EnvVarType::Number => {
            value.parse::<f64>().map_err(|_| {
                EnvkeepError::validation_field(
                    format!("Value must be numeric for type NUMBER: {}", value),
                    "value",
                )
            })?;
        }
        EnvVarType::Bool => {
            if !matches!(value.to_lowercase().as_str(), "true" | "false" | "1" | "0") {
                return Err(EnvkeepError::validation_field(
                    format!("Value must be boolean for type BOOL: {}", value),
                    "value",
                ));
            }
        }
        EnvVarType::Json => {
            serde_json::from_str::<serde_json::Value>(value).map_err(|e| {
                EnvkeepError::validation_field(
                    format!("Value must be valid JSON for type JSON: {}", e),
                    "value",
                )
            })?;
        }
        EnvVarType::String | EnvVarType::Secret => {}
    }
    Ok(())
}

/// Validate a key against the global key pattern
pub fn validate_key(key: &str) -> Result<()> {
    if !KEY_REGEX.is_match(key) {
        return Err(EnvkeepError::validation_field(
            format!("Key must match pattern ^[A-Z0-9_]{{1,100}}$: {}", key),
            "key",
        ));
    }
    Ok(())
}

/// Core domain entity: a named value scoped to one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub id: EnvVarId,
    pub key: String,
    /// Ciphertext when `is_secret`, plaintext otherwise
    pub value: String,
    pub var_type: EnvVarType,
    pub scope: ScopeRef,
    /// Ordered, duplicates allowed
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_secret: bool,
    pub status: EnvVarStatus,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_by: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl EnvVar {
    /// Construct and validate. Fails with a `Validation` error naming the
    /// violated rule rather than succeeding partially.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EnvVarId,
        key: String,
        value: String,
        var_type: EnvVarType,
        scope: ScopeRef,
        tags: Vec<String>,
        description: Option<String>,
        is_secret: bool,
        status: EnvVarStatus,
        created_by: String,
        created_at: chrono::DateTime<chrono::Utc>,
        updated_by: String,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        let env_var = Self {
            id,
            key,
            value,
            var_type,
            scope,
            tags,
            description,
            is_secret,
            status,
            created_by,
            created_at,
            updated_by,
            updated_at,
        };
        env_var.validate()?;
        Ok(env_var)
    }

    /// Re-run domain validation. Mutating use cases call this after every
    /// field change.
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;

        let encoded_size = self.value.as_bytes().len();
        if encoded_size > MAX_VALUE_SIZE {
            return Err(EnvkeepError::validation_field(
                format!("Value too large: {} bytes (limit {})", encoded_size, MAX_VALUE_SIZE),
                "value",
            ));
        }

        // Format checks apply to plaintext only. Secret values are ciphertext
        // here; the use case validates the plaintext before encrypting.
        if !self.is_secret {
            validate_value_format(self.var_type, &self.value)?;
        }

        Ok(())
    }

    /// Unique key of this variable within the whole system
    pub fn unique_key(&self) -> String {
        format!("{}:{}:{}", self.scope.level, self.scope.ref_id, self.key)
    }

    /// Whether this variable lives in a protected ENV scope (prod/production)
    pub fn is_restricted_environment(&self) -> bool {
        self.scope.level == ScopeLevel::Env
            && matches!(self.scope.ref_id.to_lowercase().as_str(), "prod" | "production")
    }

    /// Value for display: secrets always render as the fixed mask
    pub fn get_masked_value(&self) -> &str {
        if self.is_secret {
            MASKED
        } else {
            &self.value
        }
    }

    /// JSON snapshot for audit records. The value field carries the masked
    /// rendering so plaintext or ciphertext never reaches the audit trail.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.as_str(),
            "key": self.key,
            "value": self.get_masked_value(),
            "type": self.var_type.as_str(),
            "scope": { "level": self.scope.level.as_str(), "ref_id": self.scope.ref_id },
            "tags": self.tags,
            "description": self.description,
            "is_secret": self.is_secret,
            "status": self.status.as_str(),
            "created_by": self.created_by,
            "created_at": self.created_at.to_rfc3339(),
            "updated_by": self.updated_by,
            "updated_at": self.updated_at.to_rfc3339(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(key: &str, value: &str, var_type: EnvVarType, is_secret: bool) -> Result<EnvVar> {
        let now = Utc::now();
        EnvVar::new(
            EnvVarId::new(),
            key.to_string(),
            value.to_string(),
            var_type,
            ScopeRef::global(),
            vec![],
            None,
            is_secret,
            EnvVarStatus::Active,
            "tester".into(),
            now,
            "tester".into(),
            now,
        )
    }

    #[test]
    fn valid_string_var() {
        let var = sample("DATABASE_URL", "postgres://localhost", EnvVarType::String, false);
        assert!(var.is_ok());
    }

    #[test]
    fn lowercase_key_rejected() {
        let err = sample("database_url", "x", EnvVarType::String, false).unwrap_err();
        assert!(matches!(err, EnvkeepError::Validation { .. }));
    }

    #[test]
    fn key_too_long_rejected() {
        let key = "A".repeat(101);
        assert!(sample(&key, "x", EnvVarType::String, false).is_err());
    }

    #[test]
    fn number_format_enforced() {
        assert!(sample("PORT", "8080", EnvVarType::Number, false).is_ok());
        assert!(sample("PORT", "-1.5", EnvVarType::Number, false).is_ok());
        assert!(sample("PORT", "not-a-number", EnvVarType::Number, false).is_err());
    }

    #[test]
    fn bool_format_enforced() {
        for ok in ["true", "FALSE", "1", "0", "True"] {
            assert!(sample("FLAG", ok, EnvVarType::Bool, false).is_ok(), "{} should pass", ok);
        }
        assert!(sample("FLAG", "yes", EnvVarType::Bool, false).is_err());
    }

    #[test]
    fn json_format_enforced() {
        assert!(sample("CFG", r#"{"a": 1}"#, EnvVarType::Json, false).is_ok());
        assert!(sample("CFG", "{broken", EnvVarType::Json, false).is_err());
    }

    #[test]
    fn value_size_limit_enforced() {
        let value = "x".repeat(MAX_VALUE_SIZE + 1);
        assert!(sample("BIG", &value, EnvVarType::String, false).is_err());
        let value = "x".repeat(MAX_VALUE_SIZE);
        assert!(sample("BIG", &value, EnvVarType::String, false).is_ok());
    }

    #[test]
    fn secret_ciphertext_exempt_from_format_check() {
        // Ciphertext for a NUMBER-typed secret is not numeric; that is fine.
        let var = sample("API_RATE", "bm9uY2U=", EnvVarType::Number, true).unwrap();
        assert_eq!(var.get_masked_value(), MASKED);
    }

    #[test]
    fn masked_value_for_non_secret_is_plain() {
        let var = sample("HOST", "localhost", EnvVarType::String, false).unwrap();
        assert_eq!(var.get_masked_value(), "localhost");
    }

    #[test]
    fn restricted_environment_detection() {
        let now = Utc::now();
        for (ref_id, expected) in
            [("prod", true), ("Production", true), ("staging", false), ("dev", false)]
        {
            let var = EnvVar::new(
                EnvVarId::new(),
                "KEY1".into(),
                "v".into(),
                EnvVarType::String,
                ScopeRef::env(ref_id),
                vec![],
                None,
                false,
                EnvVarStatus::Active,
                "t".into(),
                now,
                "t".into(),
                now,
            )
            .unwrap();
            assert_eq!(var.is_restricted_environment(), expected, "ref_id={}", ref_id);
        }
        // Restriction applies to ENV scope only
        let var = sample("KEY1", "v", EnvVarType::String, false).unwrap();
        assert!(!var.is_restricted_environment());
    }

    #[test]
    fn snapshot_masks_secret_value() {
        let var = sample("TOKEN1", "ciphertext-blob", EnvVarType::Secret, true).unwrap();
        let snapshot = var.snapshot();
        assert_eq!(snapshot["value"], MASKED);
        assert_eq!(snapshot["key"], "TOKEN1");
    }

    #[test]
    fn unique_key_format() {
        let var = sample("DB_HOST", "h", EnvVarType::String, false).unwrap();
        assert_eq!(var.unique_key(), "GLOBAL:default:DB_HOST");
    }
}
