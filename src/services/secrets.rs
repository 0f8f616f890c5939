//! Secret use cases: reveal, rotate, schedule rotation
//!
//! Reveal is the only path that ever returns plaintext, and it is
//! time-boxed, justified where policy demands it, and audited without the
//! value. Rotation re-encrypts and records a masked version entry so the
//! history proves the rotation happened without leaking either value.

use crate::domain::{
    AuditAction, EnvVar, EnvVarId, RotationSchedule, ScheduleId, ScheduleStatus, VersionDiff,
};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{Clock, EnvStore, IdGenerator, Notifier, SecretCipher};
use crate::services::env_vars::EnvVarService;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Shortest permitted reveal window
pub const MIN_REVEAL_TTL_SECONDS: u32 = 1;
/// Longest permitted reveal window
pub const MAX_REVEAL_TTL_SECONDS: u32 = 300;
/// Window used when the caller does not ask for one
pub const DEFAULT_REVEAL_TTL_SECONDS: u32 = 30;

/// A revealed secret: plaintext plus the instant it stops being valid.
/// Callers must not retain the value past `expires_at`.
#[derive(Debug, Clone)]
pub struct RevealedSecret {
    pub env_var_id: EnvVarId,
    pub key: String,
    pub value: String,
    pub revealed_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Use cases for secret-typed environment variables
#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn EnvStore>,
    cipher: Arc<dyn SecretCipher>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    notifier: Arc<dyn Notifier>,
    env_vars: EnvVarService,
}

impl SecretService {
    pub fn new(
        store: Arc<dyn EnvStore>,
        cipher: Arc<dyn SecretCipher>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let env_vars = EnvVarService::new(
            Arc::clone(&store),
            Arc::clone(&cipher),
            Arc::clone(&clock),
            Arc::clone(&ids),
        );
        Self { store, cipher, clock, ids, notifier, env_vars }
    }

    /// Reveal a secret's plaintext for a bounded window.
    ///
    /// TTL must be 1..=300 seconds (default 30). When a matching policy
    /// requires it, a non-empty justification must accompany the request.
    /// The audit event records the TTL and justification, never the value.
    pub async fn reveal(
        &self,
        id: &EnvVarId,
        actor: &str,
        justification: Option<String>,
        ttl_seconds: Option<u32>,
    ) -> Result<RevealedSecret> {
        let ttl = ttl_seconds.unwrap_or(DEFAULT_REVEAL_TTL_SECONDS);
        if !(MIN_REVEAL_TTL_SECONDS..=MAX_REVEAL_TTL_SECONDS).contains(&ttl) {
            return Err(EnvkeepError::validation_field(
                format!(
                    "Reveal TTL must be between {} and {} seconds, got {}",
                    MIN_REVEAL_TTL_SECONDS, MAX_REVEAL_TTL_SECONDS, ttl
                ),
                "ttl_seconds",
            ));
        }

        let env_var = self.require_secret(id).await?;

        if self.justification_required(&env_var).await?
            && justification.as_deref().map_or(true, |j| j.trim().is_empty())
        {
            return Err(EnvkeepError::validation_field(
                format!("Policy requires a justification to reveal '{}'", env_var.key),
                "justification",
            ));
        }

        let plaintext = self.cipher.decrypt(&env_var.value).await?;

        let revealed_at = self.clock.now();
        let expires_at = revealed_at + chrono::Duration::seconds(i64::from(ttl));

        self.env_vars
            .audit(
                actor,
                AuditAction::Reveal,
                env_var.id.as_str(),
                None,
                Some(json!({
                    "key": env_var.key,
                    "ttl_seconds": ttl,
                    "justification": justification,
                    "expires_at": expires_at.to_rfc3339(),
                })),
                justification.clone(),
            )
            .await?;

        if let Err(error) = self
            .notifier
            .send_secret_revealed(
                &env_var.key,
                actor,
                justification.as_deref().unwrap_or(""),
            )
            .await
        {
            warn!(key = %env_var.key, %error, "Reveal notification failed");
        }

        info!(env_var_id = %env_var.id, key = %env_var.key, ttl_seconds = ttl, "Secret revealed");
        Ok(RevealedSecret {
            env_var_id: env_var.id,
            key: env_var.key,
            value: plaintext,
            revealed_at,
            expires_at,
        })
    }

    /// Replace a secret's value with a new one.
    ///
    /// The version history records masked values plus a `rotation: true`
    /// marker; neither the old nor the new plaintext is persisted anywhere
    /// but the ciphertext column.
    pub async fn rotate(&self, id: &EnvVarId, new_value: &str, actor: &str) -> Result<EnvVar> {
        let mut env_var = self.require_secret(id).await?;
        let before = env_var.snapshot();

        crate::domain::validate_value_format(env_var.var_type, new_value)?;
        env_var.value = self.cipher.encrypt(new_value).await?;
        env_var.updated_by = actor.to_string();
        env_var.updated_at = self.clock.now();
        env_var.validate()?;

        self.store.update_env_var(&env_var).await?;

        let mut diff = VersionDiff::new();
        diff.record_masked("value");
        diff.mark("rotation", true);
        self.env_vars.append_version(&env_var.id, diff, actor).await?;

        self.env_vars
            .audit(
                actor,
                AuditAction::Update,
                env_var.id.as_str(),
                Some(before),
                Some(env_var.snapshot()),
                Some("Secret rotation".to_string()),
            )
            .await?;

        info!(env_var_id = %env_var.id, key = %env_var.key, "Rotated secret");
        Ok(env_var)
    }

    /// Record the intent to rotate a secret on a schedule. The core never
    /// executes schedules; an external trigger reads ACTIVE schedules and
    /// calls `rotate` when due.
    pub async fn schedule_rotation(
        &self,
        id: &EnvVarId,
        schedule: &str,
        actor: &str,
    ) -> Result<RotationSchedule> {
        if schedule.trim().is_empty() {
            return Err(EnvkeepError::validation_field(
                "Rotation schedule expression cannot be empty",
                "schedule",
            ));
        }
        let env_var = self.require_secret(id).await?;

        let record = RotationSchedule {
            id: ScheduleId::from_string(self.ids.generate()),
            env_var_id: env_var.id.clone(),
            schedule: schedule.to_string(),
            status: ScheduleStatus::Active,
            created_by: actor.to_string(),
            created_at: self.clock.now(),
        };
        self.store.create_rotation_schedule(&record).await?;

        self.env_vars
            .audit(
                actor,
                AuditAction::Update,
                env_var.id.as_str(),
                None,
                Some(json!({
                    "rotation_schedule": record.schedule,
                    "schedule_id": record.id.as_str(),
                })),
                Some("Rotation scheduled".to_string()),
            )
            .await?;

        info!(env_var_id = %env_var.id, schedule = %record.schedule, "Scheduled secret rotation");
        Ok(record)
    }

    /// Schedules registered for one secret
    pub async fn list_schedules(&self, id: &EnvVarId) -> Result<Vec<RotationSchedule>> {
        self.require_secret(id).await?;
        self.store.list_rotation_schedules(Some(id)).await
    }

    /// Pause or resume a schedule
    pub async fn set_schedule_status(
        &self,
        schedule_id: &ScheduleId,
        status: ScheduleStatus,
    ) -> Result<RotationSchedule> {
        let schedules = self.store.list_rotation_schedules(None).await?;
        let mut schedule = schedules
            .into_iter()
            .find(|s| &s.id == schedule_id)
            .ok_or_else(|| EnvkeepError::not_found("rotation_schedule", schedule_id.as_str()))?;
        schedule.status = status;
        self.store.update_rotation_schedule(&schedule).await?;
        Ok(schedule)
    }

    async fn require_secret(&self, id: &EnvVarId) -> Result<EnvVar> {
        let env_var = self.env_vars.get(id).await?;
        if !env_var.is_secret {
            return Err(EnvkeepError::not_secret(env_var.key));
        }
        Ok(env_var)
    }

    async fn justification_required(&self, env_var: &EnvVar) -> Result<bool> {
        let policies = self.store.list_policies().await?;
        Ok(policies.iter().any(|p| p.requires_justification_for_reveal(env_var.scope.level)))
    }
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService").finish_non_exhaustive()
    }
}
