//! Approval domain entity
//!
//! One approver's decision on one release. PENDING approvals carry no
//! decision timestamp; decided approvals always do. Only PENDING approvals
//! may be mutated.

use crate::domain::id::{ApprovalId, ReleaseId};
use crate::errors::{EnvkeepError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approval decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for ApprovalDecision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Unknown approval decision: {}", s)),
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One approver's decision on one release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub release_id: ReleaseId,
    pub approver_id: String,
    pub decision: ApprovalDecision,
    pub comment: Option<String>,
    pub decided_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Approval {
    /// Construct and validate the decided_at invariant
    pub fn new(
        id: ApprovalId,
        release_id: ReleaseId,
        approver_id: String,
        decision: ApprovalDecision,
        comment: Option<String>,
        decided_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Self> {
        match (decision, decided_at) {
            (ApprovalDecision::Pending, Some(_)) => {
                return Err(EnvkeepError::validation(
                    "Pending approvals cannot have a decided_at timestamp",
                ));
            }
            (ApprovalDecision::Approved | ApprovalDecision::Rejected, None) => {
                return Err(EnvkeepError::validation(
                    "Decided approvals must have a decided_at timestamp",
                ));
            }
            _ => {}
        }
        Ok(Self { id, release_id, approver_id, decision, comment, decided_at })
    }

    pub fn is_pending(&self) -> bool {
        self.decision == ApprovalDecision::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.decision == ApprovalDecision::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.decision == ApprovalDecision::Rejected
    }

    /// Only pending approvals may change
    pub fn can_be_updated(&self) -> bool {
        self.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn pending_with_timestamp_rejected() {
        let result = Approval::new(
            ApprovalId::new(),
            ReleaseId::new(),
            "bob".into(),
            ApprovalDecision::Pending,
            None,
            Some(Utc::now()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn decided_without_timestamp_rejected() {
        for decision in [ApprovalDecision::Approved, ApprovalDecision::Rejected] {
            let result = Approval::new(
                ApprovalId::new(),
                ReleaseId::new(),
                "bob".into(),
                decision,
                None,
                None,
            );
            assert!(result.is_err(), "{:?} without decided_at should fail", decision);
        }
    }

    #[test]
    fn valid_approved() {
        let approval = Approval::new(
            ApprovalId::new(),
            ReleaseId::new(),
            "bob".into(),
            ApprovalDecision::Approved,
            Some("looks good".into()),
            Some(Utc::now()),
        )
        .unwrap();
        assert!(approval.is_approved());
        assert!(!approval.can_be_updated());
    }

    #[test]
    fn pending_can_be_updated() {
        let approval = Approval::new(
            ApprovalId::new(),
            ReleaseId::new(),
            "bob".into(),
            ApprovalDecision::Pending,
            None,
            None,
        )
        .unwrap();
        assert!(approval.is_pending());
        assert!(approval.can_be_updated());
    }
}
