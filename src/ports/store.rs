//! Persistence capability
//!
//! The store is the only persistence boundary the core knows about. It is
//! responsible for making the lookup-then-create of scoped keys and the
//! read-then-append of version numbers atomic (unique constraints,
//! per-variable serialization); the use cases treat its failures as fatal to
//! the current operation.
//!
//! Filters are tagged structs rather than string-keyed maps: each dimension
//! is an optional field, so a typo is a compile error.

use crate::domain::{
    Approval, ApprovalId, AuditEvent, EnvVar, EnvVarId, EnvVarStatus, EnvVarType, EnvVarVersion,
    Policy, Release, ReleaseId, ReleaseStatus, RotationSchedule, ScopeLevel,
};
use crate::errors::Result;
use async_trait::async_trait;

/// 1-based pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub size: u32,
}

impl Page {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page: page.max(1), size }
    }

    /// Offset of the first row in this window
    pub fn offset(&self) -> u32 {
        (self.page - 1) * self.size
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, size: 50 }
    }
}

/// Filter dimensions for env var listing and counting
#[derive(Debug, Clone, Default)]
pub struct EnvVarFilter {
    pub scope_level: Option<ScopeLevel>,
    pub scope_ref_id: Option<String>,
    /// Substring match on the key
    pub key_contains: Option<String>,
    /// Membership match on the tag list
    pub tag: Option<String>,
    pub var_type: Option<EnvVarType>,
    pub status: Option<EnvVarStatus>,
}

impl EnvVarFilter {
    /// All variables in one concrete scope
    pub fn for_scope(level: ScopeLevel, ref_id: impl Into<String>) -> Self {
        Self { scope_level: Some(level), scope_ref_id: Some(ref_id.into()), ..Self::default() }
    }

    /// In-memory predicate used by non-SQL stores
    pub fn matches(&self, env_var: &EnvVar) -> bool {
        if let Some(level) = self.scope_level {
            if env_var.scope.level != level {
                return false;
            }
        }
        if let Some(ref_id) = &self.scope_ref_id {
            if &env_var.scope.ref_id != ref_id {
                return false;
            }
        }
        if let Some(fragment) = &self.key_contains {
            if !env_var.key.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !env_var.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(var_type) = self.var_type {
            if env_var.var_type != var_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if env_var.status != status {
                return false;
            }
        }
        true
    }
}

/// Filter dimensions for release listing
#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub service_id: Option<String>,
    pub environment: Option<String>,
    pub status: Option<ReleaseStatus>,
}

impl ReleaseFilter {
    pub fn matches(&self, release: &Release) -> bool {
        if let Some(service_id) = &self.service_id {
            if &release.service_id != service_id {
                return false;
            }
        }
        if let Some(environment) = &self.environment {
            if &release.environment != environment {
                return false;
            }
        }
        if let Some(status) = self.status {
            if release.status != status {
                return false;
            }
        }
        true
    }
}

/// Filter dimensions for audit event listing
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub action: Option<crate::domain::AuditAction>,
    pub target_type: Option<crate::domain::AuditTargetType>,
    pub target_id: Option<String>,
}

impl AuditFilter {
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(actor) = &self.actor {
            if &event.actor != actor {
                return false;
            }
        }
        if let Some(action) = self.action {
            if event.action != action {
                return false;
            }
        }
        if let Some(target_type) = self.target_type {
            if event.target_type != target_type {
                return false;
            }
        }
        if let Some(target_id) = &self.target_id {
            if &event.target_id != target_id {
                return false;
            }
        }
        true
    }
}

/// Persistence boundary for all core entities
#[async_trait]
pub trait EnvStore: Send + Sync {
    // Env vars
    async fn create_env_var(&self, env_var: &EnvVar) -> Result<()>;
    async fn get_env_var(&self, id: &EnvVarId) -> Result<Option<EnvVar>>;
    async fn get_by_scoped_key(
        &self,
        level: ScopeLevel,
        ref_id: &str,
        key: &str,
    ) -> Result<Option<EnvVar>>;
    async fn update_env_var(&self, env_var: &EnvVar) -> Result<()>;
    async fn delete_env_var(&self, id: &EnvVarId) -> Result<bool>;
    async fn list_env_vars(&self, filter: &EnvVarFilter, page: Page) -> Result<Vec<EnvVar>>;
    async fn count_env_vars(&self, filter: &EnvVarFilter) -> Result<i64>;

    // Versions (append-only)
    async fn append_version(&self, version: &EnvVarVersion) -> Result<()>;
    async fn list_versions(&self, env_var_id: &EnvVarId) -> Result<Vec<EnvVarVersion>>;
    /// Next gap-free version number for a variable, starting at 1. The store
    /// must serialize this per variable under concurrent updates.
    async fn next_version(&self, env_var_id: &EnvVarId) -> Result<i64>;

    // Releases
    async fn create_release(&self, release: &Release) -> Result<()>;
    async fn get_release(&self, id: &ReleaseId) -> Result<Option<Release>>;
    async fn update_release(&self, release: &Release) -> Result<()>;
    async fn list_releases(&self, filter: &ReleaseFilter, page: Page) -> Result<Vec<Release>>;

    // Approvals
    async fn create_approval(&self, approval: &Approval) -> Result<()>;
    async fn list_approvals(&self, release_id: &ReleaseId) -> Result<Vec<Approval>>;
    async fn get_approval(&self, id: &ApprovalId) -> Result<Option<Approval>>;

    // Audit (append-only)
    async fn append_audit_event(&self, event: &AuditEvent) -> Result<()>;
    async fn list_audit_events(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditEvent>>;

    // Rotation schedules
    async fn create_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()>;
    async fn list_rotation_schedules(
        &self,
        env_var_id: Option<&EnvVarId>,
    ) -> Result<Vec<RotationSchedule>>;
    async fn update_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()>;

    // Policies
    async fn create_policy(&self, policy: &Policy) -> Result<()>;
    async fn list_policies(&self) -> Result<Vec<Policy>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offsets_are_one_based() {
        assert_eq!(Page::new(1, 50).offset(), 0);
        assert_eq!(Page::new(3, 20).offset(), 40);
        // Page 0 is clamped to 1
        assert_eq!(Page::new(0, 20).offset(), 0);
    }

    #[test]
    fn default_page() {
        let page = Page::default();
        assert_eq!(page.page, 1);
        assert_eq!(page.size, 50);
    }
}
