//! Environment variable use cases
//!
//! CRUD plus the version/history operations: every mutation validates
//! eagerly, persists the entity, appends one version record with a
//! field-level diff, and appends one audit event. Secret plaintext is
//! validated before encryption and never reaches versions or audit
//! snapshots.

use crate::domain::{
    validate_key, validate_value_format, AuditAction, AuditEvent, AuditEventId, AuditTargetType,
    DiffEntry, EnvVar, EnvVarId, EnvVarStatus, EnvVarType, EnvVarVersion, ScopeLevel, ScopeRef,
    VersionDiff, VersionId,
};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{Clock, EnvStore, EnvVarFilter, IdGenerator, Page, SecretCipher};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request to create a new environment variable
#[derive(Debug, Clone)]
pub struct CreateEnvVarRequest {
    pub key: String,
    pub value: String,
    pub var_type: EnvVarType,
    pub scope: ScopeRef,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub is_secret: bool,
}

impl CreateEnvVarRequest {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        var_type: EnvVarType,
        scope: ScopeRef,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            var_type,
            scope,
            tags: Vec::new(),
            description: None,
            is_secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.is_secret = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Request to update an existing environment variable. `None` fields are
/// left untouched; only changed fields enter the version diff.
#[derive(Debug, Clone, Default)]
pub struct UpdateEnvVarRequest {
    pub value: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
    pub status: Option<EnvVarStatus>,
}

/// Paged listing result
#[derive(Debug, Clone)]
pub struct ListEnvVarsResponse {
    pub items: Vec<EnvVar>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

/// Key-level comparison of two ENV scopes
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnvDiffReport {
    pub env1: String,
    pub env2: String,
    /// Keys present in env2 but not env1
    pub missing_in_env1: Vec<String>,
    /// Keys present in env1 but not env2
    pub missing_in_env2: Vec<String>,
    /// Keys present in both with differing values
    pub different_values: Vec<String>,
}

/// Use cases for environment variable lifecycle and history
#[derive(Clone)]
pub struct EnvVarService {
    store: Arc<dyn EnvStore>,
    cipher: Arc<dyn SecretCipher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl EnvVarService {
    pub fn new(
        store: Arc<dyn EnvStore>,
        cipher: Arc<dyn SecretCipher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { store, cipher, clock, ids }
    }

    /// Create a new environment variable in a scope.
    ///
    /// Secret plaintext is format-validated, then encrypted; the stored value
    /// is ciphertext. Creation writes one audit event but no version record:
    /// version 1 is the first mutation.
    pub async fn create(&self, request: CreateEnvVarRequest, actor: &str) -> Result<EnvVar> {
        validate_key(&request.key)?;
        validate_value_format(request.var_type, &request.value)?;

        if let Some(existing) = self
            .store
            .get_by_scoped_key(request.scope.level, &request.scope.ref_id, &request.key)
            .await?
        {
            return Err(EnvkeepError::already_exists(
                format!("Environment variable '{}' already exists", existing.unique_key()),
                "env_var",
            ));
        }

        let stored_value = if request.is_secret {
            self.cipher.encrypt(&request.value).await?
        } else {
            request.value.clone()
        };

        let now = self.clock.now();
        let env_var = EnvVar::new(
            EnvVarId::from_string(self.ids.generate()),
            request.key,
            stored_value,
            request.var_type,
            request.scope,
            request.tags,
            request.description,
            request.is_secret,
            EnvVarStatus::Active,
            actor.to_string(),
            now,
            actor.to_string(),
            now,
        )?;

        self.store.create_env_var(&env_var).await?;
        self.audit(
            actor,
            AuditAction::Create,
            env_var.id.as_str(),
            None,
            Some(env_var.snapshot()),
            None,
        )
        .await?;

        info!(
            env_var_id = %env_var.id,
            key = %env_var.key,
            scope = %env_var.scope,
            is_secret = env_var.is_secret,
            "Created environment variable"
        );
        Ok(env_var)
    }

    /// Update an environment variable, recording a version whose diff holds
    /// only the fields that actually changed.
    pub async fn update(
        &self,
        id: &EnvVarId,
        request: UpdateEnvVarRequest,
        actor: &str,
    ) -> Result<EnvVar> {
        let mut env_var = self.get(id).await?;
        let before = env_var.snapshot();
        let mut diff = VersionDiff::new();

        if let Some(new_value) = request.value {
            validate_value_format(env_var.var_type, &new_value)?;
            let stored_value = if env_var.is_secret {
                self.cipher.encrypt(&new_value).await?
            } else {
                new_value.clone()
            };
            if stored_value != env_var.value {
                if env_var.is_secret {
                    diff.record_masked("value");
                } else {
                    diff.record("value", env_var.value.clone(), new_value);
                }
                env_var.value = stored_value;
            }
        }

        if let Some(new_tags) = request.tags {
            if new_tags != env_var.tags {
                diff.record("tags", json!(env_var.tags), json!(new_tags));
                env_var.tags = new_tags;
            }
        }

        if let Some(new_description) = request.description {
            if Some(new_description.as_str()) != env_var.description.as_deref() {
                diff.record(
                    "description",
                    json!(env_var.description),
                    json!(new_description),
                );
                env_var.description = Some(new_description);
            }
        }

        if let Some(new_status) = request.status {
            if new_status != env_var.status {
                diff.record("status", env_var.status.as_str(), new_status.as_str());
                env_var.status = new_status;
            }
        }

        if diff.is_empty() {
            debug!(env_var_id = %id, "Update changed nothing, skipping version append");
            return Ok(env_var);
        }

        env_var.updated_by = actor.to_string();
        env_var.updated_at = self.clock.now();
        env_var.validate()?;

        self.store.update_env_var(&env_var).await?;
        self.append_version(&env_var.id, diff, actor).await?;
        self.audit(
            actor,
            AuditAction::Update,
            env_var.id.as_str(),
            Some(before),
            Some(env_var.snapshot()),
            None,
        )
        .await?;

        info!(env_var_id = %env_var.id, key = %env_var.key, "Updated environment variable");
        Ok(env_var)
    }

    /// Delete an environment variable.
    ///
    /// Refused outright for restricted ENV scopes (prod/production); use the
    /// release workflow for those. A refused delete writes no audit event.
    pub async fn delete(&self, id: &EnvVarId, actor: &str, reason: Option<String>) -> Result<()> {
        let env_var = self.get(id).await?;
        if env_var.is_restricted_environment() {
            warn!(env_var_id = %id, scope = %env_var.scope, "Refused delete in restricted scope");
            return Err(EnvkeepError::restricted_environment(env_var.scope.to_string()));
        }
        self.delete_unchecked(env_var, actor, reason).await
    }

    /// Delete on behalf of an approved release, bypassing the restricted
    /// scope guard. The approval chain is the authorization.
    pub(crate) async fn delete_for_release(
        &self,
        id: &EnvVarId,
        actor: &str,
        reason: Option<String>,
    ) -> Result<()> {
        let env_var = self.get(id).await?;
        self.delete_unchecked(env_var, actor, reason).await
    }

    async fn delete_unchecked(
        &self,
        env_var: EnvVar,
        actor: &str,
        reason: Option<String>,
    ) -> Result<()> {
        // Audit goes in first so the attempt is on record even if the store
        // write fails partway.
        self.audit(
            actor,
            AuditAction::Delete,
            env_var.id.as_str(),
            Some(env_var.snapshot()),
            None,
            reason,
        )
        .await?;
        let deleted = self.store.delete_env_var(&env_var.id).await?;
        if !deleted {
            return Err(EnvkeepError::not_found("env_var", env_var.id.as_str()));
        }
        info!(env_var_id = %env_var.id, key = %env_var.key, "Deleted environment variable");
        Ok(())
    }

    /// Fetch one environment variable by id
    pub async fn get(&self, id: &EnvVarId) -> Result<EnvVar> {
        self.store
            .get_env_var(id)
            .await?
            .ok_or_else(|| EnvkeepError::not_found("env_var", id.as_str()))
    }

    /// Fetch one environment variable by its scoped key
    pub async fn get_by_key(
        &self,
        level: ScopeLevel,
        ref_id: &str,
        key: &str,
    ) -> Result<EnvVar> {
        self.store.get_by_scoped_key(level, ref_id, key).await?.ok_or_else(|| {
            EnvkeepError::not_found("env_var", format!("{}:{}:{}", level, ref_id, key))
        })
    }

    /// Paged, filtered listing
    pub async fn list(&self, filter: &EnvVarFilter, page: Page) -> Result<ListEnvVarsResponse> {
        let items = self.store.list_env_vars(filter, page).await?;
        let total = self.store.count_env_vars(filter).await?;
        Ok(ListEnvVarsResponse { items, total, page: page.page, size: page.size })
    }

    /// Version history for one variable, newest last. Fails if any stored
    /// checksum no longer matches its diff.
    pub async fn list_versions(&self, id: &EnvVarId) -> Result<Vec<EnvVarVersion>> {
        // Existence check first so a bad id is NotFound, not an empty list
        self.get(id).await?;
        let versions = self.store.list_versions(id).await?;
        for version in &versions {
            if !version.verify_checksum() {
                return Err(EnvkeepError::internal(format!(
                    "Checksum mismatch on version {} of env var {}",
                    version.version,
                    id.as_str()
                )));
            }
        }
        Ok(versions)
    }

    /// Compare two ENV scopes key by key.
    ///
    /// Secrets are compared by decrypted plaintext so differing nonces do not
    /// register as differences; the report carries keys only, never values.
    pub async fn diff_environments(&self, env1: &str, env2: &str) -> Result<EnvDiffReport> {
        let vars1 = self.all_in_env(env1).await?;
        let vars2 = self.all_in_env(env2).await?;

        let mut missing_in_env1 = Vec::new();
        let mut missing_in_env2 = Vec::new();
        let mut different_values = Vec::new();

        for (key, var1) in &vars1 {
            match vars2.get(key) {
                None => missing_in_env2.push(key.clone()),
                Some(var2) => {
                    if !self.values_equal(var1, var2).await? {
                        different_values.push(key.clone());
                    }
                }
            }
        }
        for key in vars2.keys() {
            if !vars1.contains_key(key) {
                missing_in_env1.push(key.clone());
            }
        }

        Ok(EnvDiffReport {
            env1: env1.to_string(),
            env2: env2.to_string(),
            missing_in_env1,
            missing_in_env2,
            different_values,
        })
    }

    /// Roll a variable back to the state it had at `target_version`.
    ///
    /// Walks the history newest-first, applying the `old` side of each diff
    /// above the target. Refused when any diff in that range is masked: the
    /// old secret plaintext was never recorded and cannot be restored.
    pub async fn rollback_to_version(
        &self,
        id: &EnvVarId,
        target_version: i64,
        actor: &str,
    ) -> Result<EnvVar> {
        let mut env_var = self.get(id).await?;
        let before = env_var.snapshot();
        let versions = self.list_versions(id).await?;

        let latest = versions.iter().map(|v| v.version).max().unwrap_or(0);
        if target_version < 1 || target_version > latest {
            return Err(EnvkeepError::validation_field(
                format!("Version {} does not exist (history has 1..={})", target_version, latest),
                "target_version",
            ));
        }
        if target_version == latest {
            return Ok(env_var);
        }

        let mut to_revert: Vec<&EnvVarVersion> =
            versions.iter().filter(|v| v.version > target_version).collect();
        to_revert.sort_by_key(|v| std::cmp::Reverse(v.version));

        for version in &to_revert {
            if version.diff.iter().any(|(_, entry)| entry.is_masked()) {
                return Err(EnvkeepError::validation(format!(
                    "Cannot roll back across version {}: secret values are not recorded in history",
                    version.version
                )));
            }
        }

        let mut rollback_diff = VersionDiff::new();
        for version in &to_revert {
            for (field, entry) in version.diff.iter() {
                let DiffEntry::Change { old, .. } = entry else { continue };
                self.apply_old_value(&mut env_var, field, old, &mut rollback_diff)?;
            }
        }
        rollback_diff.mark("rollback_to", target_version);

        env_var.updated_by = actor.to_string();
        env_var.updated_at = self.clock.now();
        env_var.validate()?;

        self.store.update_env_var(&env_var).await?;
        self.append_version(&env_var.id, rollback_diff, actor).await?;
        self.audit(
            actor,
            AuditAction::Rollback,
            env_var.id.as_str(),
            Some(before),
            Some(env_var.snapshot()),
            Some(format!("Rollback to version {}", target_version)),
        )
        .await?;

        info!(env_var_id = %env_var.id, target_version, "Rolled back environment variable");
        Ok(env_var)
    }

    fn apply_old_value(
        &self,
        env_var: &mut EnvVar,
        field: &str,
        old: &serde_json::Value,
        rollback_diff: &mut VersionDiff,
    ) -> Result<()> {
        match field {
            "value" => {
                let old_value = old
                    .as_str()
                    .ok_or_else(|| EnvkeepError::internal("Non-string value in version diff"))?;
                rollback_diff.record("value", env_var.value.clone(), old_value);
                env_var.value = old_value.to_string();
            }
            "description" => {
                let old_description = old.as_str().map(str::to_string);
                rollback_diff.record("description", json!(env_var.description), old.clone());
                env_var.description = old_description;
            }
            "tags" => {
                let old_tags: Vec<String> = serde_json::from_value(old.clone())?;
                rollback_diff.record("tags", json!(env_var.tags), old.clone());
                env_var.tags = old_tags;
            }
            "status" => {
                let old_status: EnvVarStatus = old
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| EnvkeepError::internal("Bad status in version diff"))?;
                rollback_diff.record("status", env_var.status.as_str(), old.clone());
                env_var.status = old_status;
            }
            // Markers and unknown fields carry no entity state
            _ => {}
        }
        Ok(())
    }

    async fn all_in_env(&self, env: &str) -> Result<BTreeMap<String, EnvVar>> {
        let filter = EnvVarFilter::for_scope(ScopeLevel::Env, env);
        let mut out = BTreeMap::new();
        let mut page = Page::default();
        loop {
            let batch = self.store.list_env_vars(&filter, page).await?;
            let batch_len = batch.len();
            for var in batch {
                out.insert(var.key.clone(), var);
            }
            if (batch_len as u32) < page.size {
                break;
            }
            page = Page::new(page.page + 1, page.size);
        }
        Ok(out)
    }

    async fn values_equal(&self, a: &EnvVar, b: &EnvVar) -> Result<bool> {
        match (a.is_secret, b.is_secret) {
            (false, false) => Ok(a.value == b.value),
            (true, true) => {
                let plain_a = self.cipher.decrypt(&a.value).await?;
                let plain_b = self.cipher.decrypt(&b.value).await?;
                Ok(plain_a == plain_b)
            }
            // One secret, one not: treat as different
            _ => Ok(false),
        }
    }

    pub(crate) async fn append_version(
        &self,
        env_var_id: &EnvVarId,
        diff: VersionDiff,
        author: &str,
    ) -> Result<EnvVarVersion> {
        let number = self.store.next_version(env_var_id).await?;
        let version = EnvVarVersion::new(
            VersionId::from_string(self.ids.generate()),
            env_var_id.clone(),
            number,
            diff,
            author.to_string(),
            self.clock.now(),
        );
        self.store.append_version(&version).await?;
        debug!(env_var_id = %env_var_id, version = number, "Appended version record");
        Ok(version)
    }

    pub(crate) async fn audit(
        &self,
        actor: &str,
        action: AuditAction,
        target_id: &str,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        reason: Option<String>,
    ) -> Result<()> {
        let event = AuditEvent::new(
            AuditEventId::from_string(self.ids.generate()),
            actor.to_string(),
            action,
            AuditTargetType::EnvVar,
            target_id.to_string(),
            before,
            after,
            reason,
            self.clock.now(),
        )?;
        self.store.append_audit_event(&event).await
    }
}

impl std::fmt::Debug for EnvVarService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvVarService").finish_non_exhaustive()
    }
}
