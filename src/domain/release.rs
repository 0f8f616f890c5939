//! Release domain entity
//!
//! A release is a named, reviewable batch of env var changes for one
//! (service, environment) pair, gated by the approval state machine:
//! DRAFT -> PENDING_APPROVAL -> APPROVED -> APPLIED, with REJECTED and
//! CANCELLED as alternate terminal states.

use crate::domain::env_var::EnvVarType;
use crate::domain::id::{EnvVarId, ReleaseId};
use crate::errors::{EnvkeepError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    Draft,
    PendingApproval,
    Approved,
    Applied,
    Rejected,
    Cancelled,
}

impl ReleaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Applied => "APPLIED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Rejected | Self::Cancelled)
    }
}

impl FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PENDING_APPROVAL" => Ok(Self::PendingApproval),
            "APPROVED" => Ok(Self::Approved),
            "APPLIED" => Ok(Self::Applied),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown release status: {}", s)),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action a single release change performs on its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One change descriptor in a release: an action plus the fields it needs.
///
/// CREATE requires `key`/`value`; UPDATE and DELETE require `env_var_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseChange {
    pub action: ChangeAction,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var_id: Option<EnvVarId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<EnvVarType>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReleaseChange {
    pub fn create(key: impl Into<String>, value: impl Into<String>, var_type: EnvVarType) -> Self {
        Self {
            action: ChangeAction::Create,
            key: key.into(),
            env_var_id: None,
            value: Some(value.into()),
            var_type: Some(var_type),
            is_secret: false,
            tags: Vec::new(),
            description: None,
        }
    }

    pub fn update(key: impl Into<String>, env_var_id: EnvVarId, value: impl Into<String>) -> Self {
        Self {
            action: ChangeAction::Update,
            key: key.into(),
            env_var_id: Some(env_var_id),
            value: Some(value.into()),
            var_type: None,
            is_secret: false,
            tags: Vec::new(),
            description: None,
        }
    }

    pub fn delete(key: impl Into<String>, env_var_id: EnvVarId) -> Self {
        Self {
            action: ChangeAction::Delete,
            key: key.into(),
            env_var_id: Some(env_var_id),
            value: None,
            var_type: None,
            is_secret: false,
            tags: Vec::new(),
            description: None,
        }
    }
}

/// Reviewable batch of env var changes destined for one service/environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub service_id: String,
    pub environment: String,
    pub title: String,
    pub description: Option<String>,
    pub status: ReleaseStatus,
    pub changes: Vec<ReleaseChange>,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub applied_by: Option<String>,
    pub applied_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Release {
    /// Construct and validate: a release needs a non-empty title and at
    /// least one change.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ReleaseId,
        service_id: String,
        environment: String,
        title: String,
        description: Option<String>,
        status: ReleaseStatus,
        changes: Vec<ReleaseChange>,
        created_by: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        if title.trim().is_empty() {
            return Err(EnvkeepError::validation_field("Release title cannot be empty", "title"));
        }
        if changes.is_empty() {
            return Err(EnvkeepError::validation_field(
                "Release must have at least one change",
                "changes",
            ));
        }
        Ok(Self {
            id,
            service_id,
            environment,
            title,
            description,
            status,
            changes,
            created_by,
            created_at,
            applied_by: None,
            applied_at: None,
        })
    }

    pub fn can_be_approved(&self) -> bool {
        self.status == ReleaseStatus::PendingApproval
    }

    pub fn can_be_applied(&self) -> bool {
        self.status == ReleaseStatus::Approved
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(self.status, ReleaseStatus::Draft | ReleaseStatus::PendingApproval)
    }

    /// Whether the target environment is a protected one (prod/production)
    pub fn targets_restricted_environment(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "prod" | "production")
    }

    /// Human-readable summary of the batched changes
    pub fn change_summary(&self) -> String {
        self.changes
            .iter()
            .map(|c| format!("{}: {}", c.action, c.key))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
