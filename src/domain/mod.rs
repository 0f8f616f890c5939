//! Domain entities and invariants
//!
//! The scoped env var record, its append-only version history, the
//! release/approval state machine, the audit ledger, and the policy rules
//! that bind them together.

pub mod approval;
pub mod audit;
pub mod env_var;
pub mod id;
pub mod masking;
pub mod policy;
pub mod release;
pub mod rotation;
pub mod version;

pub use approval::{Approval, ApprovalDecision};
pub use audit::{AuditAction, AuditEvent, AuditTargetType};
pub use env_var::{
    validate_key, validate_value_format, EnvVar, EnvVarStatus, EnvVarType, ScopeLevel, ScopeRef,
    MAX_VALUE_SIZE,
};
pub use id::{
    ApprovalId, AuditEventId, EnvVarId, PolicyId, ReleaseId, ScheduleId, VersionId,
};
pub use masking::{mask_sensitive, MASKED, SENSITIVE_FIELDS};
pub use policy::Policy;
pub use release::{ChangeAction, Release, ReleaseChange, ReleaseStatus};
pub use rotation::{RotationSchedule, ScheduleStatus};
pub use version::{DiffEntry, EnvVarVersion, VersionDiff};
