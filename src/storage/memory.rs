//! In-memory implementation of the `EnvStore` port
//!
//! Backs unit tests and examples without touching disk. Same observable
//! semantics as the SQLite store: scoped-key uniqueness, gap-free version
//! numbers, append-only versions and audit events.

use crate::domain::{
    Approval, ApprovalId, AuditEvent, EnvVar, EnvVarId, EnvVarVersion, Policy, Release, ReleaseId,
    RotationSchedule, ScopeLevel,
};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{AuditFilter, EnvStore, EnvVarFilter, Page, ReleaseFilter};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    env_vars: Vec<EnvVar>,
    versions: Vec<EnvVarVersion>,
    releases: Vec<Release>,
    approvals: Vec<Approval>,
    audit_events: Vec<AuditEvent>,
    schedules: Vec<RotationSchedule>,
    policies: Vec<Policy>,
}

/// Mutex-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryEnvStore {
    inner: Mutex<Inner>,
}

impl MemoryEnvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| EnvkeepError::internal("Memory store lock poisoned"))
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .collect()
}

#[async_trait]
impl EnvStore for MemoryEnvStore {
    async fn create_env_var(&self, env_var: &EnvVar) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.env_vars.iter().any(|v| {
            v.scope.level == env_var.scope.level
                && v.scope.ref_id == env_var.scope.ref_id
                && v.key == env_var.key
        }) {
            return Err(EnvkeepError::already_exists(
                format!("Environment variable '{}' already exists", env_var.unique_key()),
                "env_var",
            ));
        }
        inner.env_vars.push(env_var.clone());
        Ok(())
    }

    async fn get_env_var(&self, id: &EnvVarId) -> Result<Option<EnvVar>> {
        let inner = self.lock()?;
        Ok(inner.env_vars.iter().find(|v| &v.id == id).cloned())
    }

    async fn get_by_scoped_key(
        &self,
        level: ScopeLevel,
        ref_id: &str,
        key: &str,
    ) -> Result<Option<EnvVar>> {
        let inner = self.lock()?;
        Ok(inner
            .env_vars
            .iter()
            .find(|v| v.scope.level == level && v.scope.ref_id == ref_id && v.key == key)
            .cloned())
    }

    async fn update_env_var(&self, env_var: &EnvVar) -> Result<()> {
        let mut inner = self.lock()?;
        let slot = inner
            .env_vars
            .iter_mut()
            .find(|v| v.id == env_var.id)
            .ok_or_else(|| EnvkeepError::not_found("env_var", env_var.id.as_str()))?;
        *slot = env_var.clone();
        Ok(())
    }

    async fn delete_env_var(&self, id: &EnvVarId) -> Result<bool> {
        let mut inner = self.lock()?;
        let before = inner.env_vars.len();
        inner.env_vars.retain(|v| &v.id != id);
        Ok(inner.env_vars.len() < before)
    }

    async fn list_env_vars(&self, filter: &EnvVarFilter, page: Page) -> Result<Vec<EnvVar>> {
        let inner = self.lock()?;
        let mut matched: Vec<EnvVar> =
            inner.env_vars.iter().filter(|v| filter.matches(v)).cloned().collect();
        matched.sort_by(|a, b| {
            (a.scope.level.as_str(), &a.scope.ref_id, &a.key)
                .cmp(&(b.scope.level.as_str(), &b.scope.ref_id, &b.key))
        });
        Ok(paginate(matched, page))
    }

    async fn count_env_vars(&self, filter: &EnvVarFilter) -> Result<i64> {
        let inner = self.lock()?;
        Ok(inner.env_vars.iter().filter(|v| filter.matches(v)).count() as i64)
    }

    async fn append_version(&self, version: &EnvVarVersion) -> Result<()> {
        let mut inner = self.lock()?;
        if inner
            .versions
            .iter()
            .any(|v| v.env_var_id == version.env_var_id && v.version == version.version)
        {
            return Err(EnvkeepError::already_exists(
                format!(
                    "Version {} already exists for env var {}",
                    version.version,
                    version.env_var_id.as_str()
                ),
                "env_var_version",
            ));
        }
        inner.versions.push(version.clone());
        Ok(())
    }

    async fn list_versions(&self, env_var_id: &EnvVarId) -> Result<Vec<EnvVarVersion>> {
        let inner = self.lock()?;
        let mut versions: Vec<EnvVarVersion> =
            inner.versions.iter().filter(|v| &v.env_var_id == env_var_id).cloned().collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn next_version(&self, env_var_id: &EnvVarId) -> Result<i64> {
        let inner = self.lock()?;
        Ok(inner
            .versions
            .iter()
            .filter(|v| &v.env_var_id == env_var_id)
            .map(|v| v.version)
            .max()
            .unwrap_or(0)
            + 1)
    }

    async fn create_release(&self, release: &Release) -> Result<()> {
        let mut inner = self.lock()?;
        inner.releases.push(release.clone());
        Ok(())
    }

    async fn get_release(&self, id: &ReleaseId) -> Result<Option<Release>> {
        let inner = self.lock()?;
        Ok(inner.releases.iter().find(|r| &r.id == id).cloned())
    }

    async fn update_release(&self, release: &Release) -> Result<()> {
        let mut inner = self.lock()?;
        let slot = inner
            .releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(|| EnvkeepError::not_found("release", release.id.as_str()))?;
        *slot = release.clone();
        Ok(())
    }

    async fn list_releases(&self, filter: &ReleaseFilter, page: Page) -> Result<Vec<Release>> {
        let inner = self.lock()?;
        let mut matched: Vec<Release> =
            inner.releases.iter().filter(|r| filter.matches(r)).cloned().collect();
        matched.sort_by_key(|r| std::cmp::Reverse(r.created_at));
        Ok(paginate(matched, page))
    }

    async fn create_approval(&self, approval: &Approval) -> Result<()> {
        let mut inner = self.lock()?;
        inner.approvals.push(approval.clone());
        Ok(())
    }

    async fn list_approvals(&self, release_id: &ReleaseId) -> Result<Vec<Approval>> {
        let inner = self.lock()?;
        Ok(inner.approvals.iter().filter(|a| &a.release_id == release_id).cloned().collect())
    }

    async fn get_approval(&self, id: &ApprovalId) -> Result<Option<Approval>> {
        let inner = self.lock()?;
        Ok(inner.approvals.iter().find(|a| &a.id == id).cloned())
    }

    async fn append_audit_event(&self, event: &AuditEvent) -> Result<()> {
        let mut inner = self.lock()?;
        inner.audit_events.push(event.clone());
        Ok(())
    }

    async fn list_audit_events(
        &self,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Vec<AuditEvent>> {
        let inner = self.lock()?;
        let mut matched: Vec<AuditEvent> =
            inner.audit_events.iter().filter(|e| filter.matches(e)).cloned().collect();
        matched.sort_by_key(|e| std::cmp::Reverse(e.timestamp));
        Ok(paginate(matched, page))
    }

    async fn create_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()> {
        let mut inner = self.lock()?;
        inner.schedules.push(schedule.clone());
        Ok(())
    }

    async fn list_rotation_schedules(
        &self,
        env_var_id: Option<&EnvVarId>,
    ) -> Result<Vec<RotationSchedule>> {
        let inner = self.lock()?;
        Ok(inner
            .schedules
            .iter()
            .filter(|s| env_var_id.map_or(true, |id| &s.env_var_id == id))
            .cloned()
            .collect())
    }

    async fn update_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()> {
        let mut inner = self.lock()?;
        let slot = inner
            .schedules
            .iter_mut()
            .find(|s| s.id == schedule.id)
            .ok_or_else(|| EnvkeepError::not_found("rotation_schedule", schedule.id.as_str()))?;
        *slot = schedule.clone();
        Ok(())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<()> {
        let mut inner = self.lock()?;
        inner.policies.push(policy.clone());
        Ok(())
    }

    async fn list_policies(&self) -> Result<Vec<Policy>> {
        let inner = self.lock()?;
        Ok(inner.policies.clone())
    }
}
