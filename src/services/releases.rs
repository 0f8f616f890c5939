//! Release workflow use cases
//!
//! A release batches env var changes behind the approval state machine.
//! Creation decides whether approval is needed (matching policy, or the
//! built-in guard for prod/production environments); approve and reject
//! record per-approver decisions; apply re-checks the quorum and dispatches
//! each change in order through the env var use cases.

use crate::domain::{
    ApprovalDecision, AuditAction, AuditEvent, AuditEventId, AuditTargetType, ChangeAction,
    Approval, ApprovalId, EnvVarStatus, Release, ReleaseChange, ReleaseId, ReleaseStatus, ScopeLevel,
    ScopeRef,
};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{Clock, EnvStore, IdGenerator, Notifier, Page, ReleaseFilter, SecretCipher};
use crate::services::env_vars::{CreateEnvVarRequest, EnvVarService, UpdateEnvVarRequest};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Request to create a release
#[derive(Debug, Clone)]
pub struct CreateReleaseRequest {
    pub service_id: String,
    pub environment: String,
    pub title: String,
    pub description: Option<String>,
    pub changes: Vec<ReleaseChange>,
}

/// Use cases for the release approval workflow
#[derive(Clone)]
pub struct ReleaseService {
    store: Arc<dyn EnvStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    notifier: Arc<dyn Notifier>,
    env_vars: EnvVarService,
}

impl ReleaseService {
    pub fn new(
        store: Arc<dyn EnvStore>,
        cipher: Arc<dyn SecretCipher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let env_vars = EnvVarService::new(
            Arc::clone(&store),
            cipher,
            Arc::clone(&clock),
            Arc::clone(&ids),
        );
        Self { store, clock, ids, notifier, env_vars }
    }

    /// Create a release. Starts in PENDING_APPROVAL when a matching policy
    /// requires approval or the target environment is restricted; otherwise
    /// it is born APPROVED and can be applied immediately.
    pub async fn create(&self, request: CreateReleaseRequest, actor: &str) -> Result<Release> {
        let needs_approval = self.approval_required(&request.environment).await?;
        let status = if needs_approval {
            ReleaseStatus::PendingApproval
        } else {
            ReleaseStatus::Approved
        };

        let release = Release::new(
            ReleaseId::from_string(self.ids.generate()),
            request.service_id,
            request.environment,
            request.title,
            request.description,
            status,
            request.changes,
            actor.to_string(),
            self.clock.now(),
        )?;

        self.store.create_release(&release).await?;
        self.audit(
            actor,
            AuditAction::Create,
            &release,
            None,
            Some(release_snapshot(&release)),
            None,
        )
        .await?;

        if release.status == ReleaseStatus::PendingApproval {
            if let Err(error) = self
                .notifier
                .send_approval_request(release.id.as_str(), &release.title, &release.environment)
                .await
            {
                warn!(release_id = %release.id, %error, "Approval request notification failed");
            }
        }

        info!(
            release_id = %release.id,
            environment = %release.environment,
            status = %release.status,
            changes = release.changes.len(),
            "Created release"
        );
        Ok(release)
    }

    /// Record one approver's APPROVED decision. The release transitions to
    /// APPROVED once distinct approvers reach the policy quorum. Authors
    /// cannot approve their own releases.
    pub async fn approve(
        &self,
        id: &ReleaseId,
        approver: &str,
        comment: Option<String>,
    ) -> Result<Release> {
        let mut release = self.get(id).await?;
        if !release.can_be_approved() {
            return Err(EnvkeepError::invalid_transition(
                "release",
                id.as_str(),
                format!("cannot approve from {} status", release.status),
            ));
        }
        if release.created_by == approver {
            return Err(EnvkeepError::validation_field(
                "Release authors cannot approve their own releases",
                "approver",
            ));
        }

        let existing = self.store.list_approvals(id).await?;
        if existing.iter().any(|a| a.approver_id == approver && !a.is_pending()) {
            return Err(EnvkeepError::invalid_transition(
                "approval",
                id.as_str(),
                format!("approver '{}' has already decided", approver),
            ));
        }

        let approval = Approval::new(
            ApprovalId::from_string(self.ids.generate()),
            release.id.clone(),
            approver.to_string(),
            ApprovalDecision::Approved,
            comment.clone(),
            Some(self.clock.now()),
        )?;
        self.store.create_approval(&approval).await?;

        let approved = self.distinct_approvers(id).await?;
        let required = self.required_approvers(&release.environment).await?;
        let before = release_snapshot(&release);
        if approved >= required {
            release.status = ReleaseStatus::Approved;
            self.store.update_release(&release).await?;
        }

        self.audit(
            approver,
            AuditAction::Approve,
            &release,
            Some(before),
            Some(release_snapshot(&release)),
            comment.clone(),
        )
        .await?;

        if let Err(error) = self
            .notifier
            .send_approval_decision(id.as_str(), "APPROVED", approver, comment.as_deref())
            .await
        {
            warn!(release_id = %id, %error, "Approval decision notification failed");
        }

        info!(
            release_id = %id,
            approver,
            approved,
            required,
            status = %release.status,
            "Recorded approval"
        );
        Ok(release)
    }

    /// Record a REJECTED decision. A single rejection terminates the release.
    pub async fn reject(
        &self,
        id: &ReleaseId,
        approver: &str,
        comment: Option<String>,
    ) -> Result<Release> {
        let mut release = self.get(id).await?;
        if !release.can_be_approved() {
            return Err(EnvkeepError::invalid_transition(
                "release",
                id.as_str(),
                format!("cannot reject from {} status", release.status),
            ));
        }

        let approval = Approval::new(
            ApprovalId::from_string(self.ids.generate()),
            release.id.clone(),
            approver.to_string(),
            ApprovalDecision::Rejected,
            comment.clone(),
            Some(self.clock.now()),
        )?;
        self.store.create_approval(&approval).await?;

        let before = release_snapshot(&release);
        release.status = ReleaseStatus::Rejected;
        self.store.update_release(&release).await?;

        self.audit(
            approver,
            AuditAction::Reject,
            &release,
            Some(before),
            Some(release_snapshot(&release)),
            comment.clone(),
        )
        .await?;

        if let Err(error) = self
            .notifier
            .send_approval_decision(id.as_str(), "REJECTED", approver, comment.as_deref())
            .await
        {
            warn!(release_id = %id, %error, "Rejection notification failed");
        }

        info!(release_id = %id, approver, "Rejected release");
        Ok(release)
    }

    /// Apply an APPROVED release: re-verify the quorum, then dispatch each
    /// change in order through the env var use cases at the release's ENV
    /// scope.
    ///
    /// A mid-batch failure stops the dispatch and surfaces a `ReleaseApply`
    /// error naming the indices already applied; those changes stay applied
    /// and the release stays APPROVED so a corrected retry can resume.
    pub async fn apply(&self, id: &ReleaseId, actor: &str) -> Result<Release> {
        let mut release = self.get(id).await?;
        if !release.can_be_applied() {
            return Err(EnvkeepError::invalid_transition(
                "release",
                id.as_str(),
                format!("cannot apply from {} status", release.status),
            ));
        }

        let required = self.required_approvers(&release.environment).await?;
        if required > 0 {
            let approved = self.distinct_approvers(id).await?;
            if approved < required {
                return Err(EnvkeepError::invalid_transition(
                    "release",
                    id.as_str(),
                    format!("quorum not met: {} of {} required approvals", approved, required),
                ));
            }
        }

        let mut applied = Vec::with_capacity(release.changes.len());
        for (index, change) in release.changes.iter().enumerate() {
            if let Err(error) = self.dispatch(change, &release.environment, actor).await {
                warn!(
                    release_id = %id,
                    failed_index = index,
                    %error,
                    "Release apply stopped partway"
                );
                return Err(EnvkeepError::ReleaseApply {
                    release_id: id.as_str().to_string(),
                    applied,
                    failed_index: index,
                    message: error.to_string(),
                });
            }
            applied.push(index);
        }

        let before = release_snapshot(&release);
        release.status = ReleaseStatus::Applied;
        release.applied_by = Some(actor.to_string());
        release.applied_at = Some(self.clock.now());
        self.store.update_release(&release).await?;

        self.audit(
            actor,
            AuditAction::Apply,
            &release,
            Some(before),
            Some(release_snapshot(&release)),
            None,
        )
        .await?;

        if let Err(error) =
            self.notifier.send_release_applied(id.as_str(), &release.title, actor).await
        {
            warn!(release_id = %id, %error, "Release applied notification failed");
        }

        info!(release_id = %id, changes = release.changes.len(), "Applied release");
        Ok(release)
    }

    /// Cancel a DRAFT or PENDING_APPROVAL release
    pub async fn cancel(&self, id: &ReleaseId, actor: &str) -> Result<Release> {
        let mut release = self.get(id).await?;
        if !release.can_be_cancelled() {
            return Err(EnvkeepError::invalid_transition(
                "release",
                id.as_str(),
                format!("cannot cancel from {} status", release.status),
            ));
        }

        let before = release_snapshot(&release);
        release.status = ReleaseStatus::Cancelled;
        self.store.update_release(&release).await?;

        self.audit(
            actor,
            AuditAction::Update,
            &release,
            Some(before),
            Some(release_snapshot(&release)),
            Some("Release cancelled".to_string()),
        )
        .await?;

        info!(release_id = %id, "Cancelled release");
        Ok(release)
    }

    /// Fetch one release by id
    pub async fn get(&self, id: &ReleaseId) -> Result<Release> {
        self.store
            .get_release(id)
            .await?
            .ok_or_else(|| EnvkeepError::not_found("release", id.as_str()))
    }

    /// Paged, filtered listing
    pub async fn list(&self, filter: &ReleaseFilter, page: Page) -> Result<Vec<Release>> {
        self.store.list_releases(filter, page).await
    }

    /// Approvals recorded for one release
    pub async fn approvals(&self, id: &ReleaseId) -> Result<Vec<Approval>> {
        self.get(id).await?;
        self.store.list_approvals(id).await
    }

    async fn dispatch(&self, change: &ReleaseChange, environment: &str, actor: &str) -> Result<()> {
        match change.action {
            ChangeAction::Create => {
                let value = change.value.as_deref().ok_or_else(|| {
                    EnvkeepError::validation_field("CREATE change requires a value", "value")
                })?;
                let var_type = change.var_type.ok_or_else(|| {
                    EnvkeepError::validation_field("CREATE change requires a var_type", "var_type")
                })?;
                let mut request = CreateEnvVarRequest::new(
                    change.key.clone(),
                    value,
                    var_type,
                    ScopeRef::env(environment),
                );
                request.is_secret = change.is_secret;
                request.tags = change.tags.clone();
                request.description = change.description.clone();
                self.env_vars.create(request, actor).await?;
            }
            ChangeAction::Update => {
                let env_var_id = change.env_var_id.as_ref().ok_or_else(|| {
                    EnvkeepError::validation_field(
                        "UPDATE change requires an env_var_id",
                        "env_var_id",
                    )
                })?;
                let request = UpdateEnvVarRequest {
                    value: change.value.clone(),
                    tags: if change.tags.is_empty() { None } else { Some(change.tags.clone()) },
                    description: change.description.clone(),
                    status: None::<EnvVarStatus>,
                };
                self.env_vars.update(env_var_id, request, actor).await?;
            }
            ChangeAction::Delete => {
                let env_var_id = change.env_var_id.as_ref().ok_or_else(|| {
                    EnvkeepError::validation_field(
                        "DELETE change requires an env_var_id",
                        "env_var_id",
                    )
                })?;
                self.env_vars
                    .delete_for_release(env_var_id, actor, Some("Applied by release".to_string()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn approval_required(&self, environment: &str) -> Result<bool> {
        let policies = self.store.list_policies().await?;
        if policies.iter().any(|p| p.requires_approval_for(ScopeLevel::Env)) {
            return Ok(true);
        }
        // Built-in guard when no policy says otherwise
        Ok(matches!(environment.to_lowercase().as_str(), "prod" | "production"))
    }

    /// Quorum for a target environment: the strictest matching policy, or 1
    /// when only the built-in restricted guard applies.
    async fn required_approvers(&self, environment: &str) -> Result<u32> {
        let policies = self.store.list_policies().await?;
        let from_policy = policies
            .iter()
            .filter(|p| p.requires_approval_for(ScopeLevel::Env))
            .map(|p| p.min_approvers_for(ScopeLevel::Env).max(1))
            .max();
        if let Some(required) = from_policy {
            return Ok(required);
        }
        if matches!(environment.to_lowercase().as_str(), "prod" | "production") {
            return Ok(1);
        }
        Ok(0)
    }

    async fn distinct_approvers(&self, id: &ReleaseId) -> Result<u32> {
        let approvals = self.store.list_approvals(id).await?;
        let approvers: HashSet<&str> = approvals
            .iter()
            .filter(|a| a.is_approved())
            .map(|a| a.approver_id.as_str())
            .collect();
        Ok(approvers.len() as u32)
    }

    async fn audit(
        &self,
        actor: &str,
        action: AuditAction,
        release: &Release,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        reason: Option<String>,
    ) -> Result<()> {
        let event = AuditEvent::new(
            AuditEventId::from_string(self.ids.generate()),
            actor.to_string(),
            action,
            AuditTargetType::Release,
            release.id.as_str().to_string(),
            before,
            after,
            reason,
            self.clock.now(),
        )?;
        self.store.append_audit_event(&event).await
    }
}

fn release_snapshot(release: &Release) -> serde_json::Value {
    json!({
        "id": release.id.as_str(),
        "service_id": release.service_id,
        "environment": release.environment,
        "title": release.title,
        "status": release.status.as_str(),
        "changes": release.change_summary(),
        "created_by": release.created_by,
    })
}

impl std::fmt::Debug for ReleaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseService").finish_non_exhaustive()
    }
}
