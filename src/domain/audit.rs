//! Audit event domain entity
//!
//! The accountability ledger: an immutable record of an actor performing an
//! action on a target. Created with every mutation, never mutated or deleted.
//! Stored snapshots already carry masked secret values (they come from
//! `EnvVar::snapshot()`); outward rendering additionally masks sensitive
//! field names through the shared masking utility.

use crate::domain::id::AuditEventId;
use crate::domain::masking;
use crate::errors::{EnvkeepError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Reveal,
    Approve,
    Reject,
    Apply,
    Rollback,
    Export,
    Import,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Reveal => "REVEAL",
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
            Self::Apply => "APPLY",
            Self::Rollback => "ROLLBACK",
            Self::Export => "EXPORT",
            Self::Import => "IMPORT",
        }
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "REVEAL" => Ok(Self::Reveal),
            "APPROVE" => Ok(Self::Approve),
            "REJECT" => Ok(Self::Reject),
            "APPLY" => Ok(Self::Apply),
            "ROLLBACK" => Ok(Self::Rollback),
            "EXPORT" => Ok(Self::Export),
            "IMPORT" => Ok(Self::Import),
            _ => Err(format!("Unknown audit action: {}", s)),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit target types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditTargetType {
    EnvVar,
    Release,
    Approval,
    Policy,
}

impl AuditTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnvVar => "ENV_VAR",
            Self::Release => "RELEASE",
            Self::Approval => "APPROVAL",
            Self::Policy => "POLICY",
        }
    }
}

impl FromStr for AuditTargetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ENV_VAR" => Ok(Self::EnvVar),
            "RELEASE" => Ok(Self::Release),
            "APPROVAL" => Ok(Self::Approval),
            "POLICY" => Ok(Self::Policy),
            _ => Err(format!("Unknown audit target type: {}", s)),
        }
    }
}

impl fmt::Display for AuditTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of who did what to which entity and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditEventId,
    pub actor: String,
    pub action: AuditAction,
    pub target_type: AuditTargetType,
    pub target_id: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub reason: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl AuditEvent {
    /// Construct and validate: UPDATE/APPROVE/REJECT events must carry at
    /// least one snapshot.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AuditEventId,
        actor: String,
        action: AuditAction,
        target_type: AuditTargetType,
        target_id: String,
        before: Option<Value>,
        after: Option<Value>,
        reason: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        if matches!(action, AuditAction::Update | AuditAction::Approve | AuditAction::Reject)
            && before.is_none()
            && after.is_none()
        {
            return Err(EnvkeepError::validation(format!(
                "Action {} requires a before or after snapshot",
                action
            )));
        }
        Ok(Self { id, actor, action, target_type, target_id, before, after, reason, timestamp })
    }

    /// Before snapshot with sensitive field names masked, for outward rendering
    pub fn masked_before(&self) -> Option<Value> {
        self.before.as_ref().map(masking::mask_sensitive)
    }

    /// After snapshot with sensitive field names masked, for outward rendering
    pub fn masked_after(&self) -> Option<Value> {
        self.after.as_ref().map(masking::mask_sensitive)
    }

    /// Actions logged with extra care
    pub fn is_sensitive_action(&self) -> bool {
        matches!(
            self.action,
            AuditAction::Reveal | AuditAction::Delete | AuditAction::Approve | AuditAction::Reject
        )
    }

    /// Human-readable one-line description
    pub fn describe(&self) -> String {
        format!(
            "{} performed {} on {} {}",
            self.actor, self.action, self.target_type, self.target_id
        )
    }
}
