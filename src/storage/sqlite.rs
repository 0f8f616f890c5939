//! SQLite implementation of the `EnvStore` port
//!
//! Entities map to rows through `FromRow` structs; enum fields and
//! timestamps are stored as TEXT, structured fields (tags, changes, diffs,
//! snapshots) as JSON text. Scoped-key uniqueness and version-number
//! uniqueness are enforced by schema constraints, so concurrent writers
//! surface as database errors rather than silent duplicates.

use crate::domain::{
    Approval, ApprovalDecision, ApprovalId, AuditAction, AuditEvent, AuditEventId,
    AuditTargetType, EnvVar, EnvVarId, EnvVarStatus, EnvVarType, EnvVarVersion, Policy, PolicyId,
    Release, ReleaseChange, ReleaseId, ReleaseStatus, RotationSchedule, ScheduleId,
    ScheduleStatus, ScopeLevel, ScopeRef, VersionDiff, VersionId,
};
use crate::errors::{EnvkeepError, Result};
use crate::ports::{AuditFilter, EnvStore, EnvVarFilter, Page, ReleaseFilter};
use crate::storage::pool::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteEnvStore {
    pool: DbPool,
}

impl SqliteEnvStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EnvkeepError::internal(format!("Bad timestamp in column {}: {}", column, e)))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(raw: &str, column: &str) -> Result<T> {
    raw.parse()
        .map_err(|e: String| EnvkeepError::internal(format!("Bad value in column {}: {}", column, e)))
}

#[derive(Debug, FromRow)]
struct EnvVarRow {
    id: String,
    key: String,
    value: String,
    var_type: String,
    scope_level: String,
    scope_ref_id: String,
    tags: String,
    description: Option<String>,
    is_secret: bool,
    status: String,
    created_by: String,
    created_at: String,
    updated_by: String,
    updated_at: String,
}

impl EnvVarRow {
    fn into_entity(self) -> Result<EnvVar> {
        Ok(EnvVar {
            id: EnvVarId::from_string(self.id),
            key: self.key,
            value: self.value,
            var_type: parse_enum::<EnvVarType>(&self.var_type, "var_type")?,
            scope: ScopeRef::new(
                parse_enum::<ScopeLevel>(&self.scope_level, "scope_level")?,
                self.scope_ref_id,
            ),
            tags: serde_json::from_str(&self.tags)?,
            description: self.description,
            is_secret: self.is_secret,
            status: parse_enum::<EnvVarStatus>(&self.status, "status")?,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_by: self.updated_by,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
struct VersionRow {
    id: String,
    env_var_id: String,
    version: i64,
    diff: String,
    checksum: String,
    author: String,
    created_at: String,
}

impl VersionRow {
    fn into_entity(self) -> Result<EnvVarVersion> {
        let diff: VersionDiff = serde_json::from_str(&self.diff)?;
        Ok(EnvVarVersion {
            id: VersionId::from_string(self.id),
            env_var_id: EnvVarId::from_string(self.env_var_id),
            version: self.version,
            diff,
            checksum: self.checksum,
            author: self.author,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ReleaseRow {
    id: String,
    service_id: String,
    environment: String,
    title: String,
    description: Option<String>,
    status: String,
    changes: String,
    created_by: String,
    created_at: String,
    applied_by: Option<String>,
    applied_at: Option<String>,
}

impl ReleaseRow {
    fn into_entity(self) -> Result<Release> {
        let changes: Vec<ReleaseChange> = serde_json::from_str(&self.changes)?;
        Ok(Release {
            id: ReleaseId::from_string(self.id),
            service_id: self.service_id,
            environment: self.environment,
            title: self.title,
            description: self.description,
            status: parse_enum::<ReleaseStatus>(&self.status, "status")?,
            changes,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            applied_by: self.applied_by,
            applied_at: self
                .applied_at
                .as_deref()
                .map(|raw| parse_timestamp(raw, "applied_at"))
                .transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ApprovalRow {
    id: String,
    release_id: String,
    approver_id: String,
    decision: String,
    comment: Option<String>,
    decided_at: Option<String>,
}

impl ApprovalRow {
    fn into_entity(self) -> Result<Approval> {
        Ok(Approval {
            id: ApprovalId::from_string(self.id),
            release_id: ReleaseId::from_string(self.release_id),
            approver_id: self.approver_id,
            decision: parse_enum::<ApprovalDecision>(&self.decision, "decision")?,
            comment: self.comment,
            decided_at: self
                .decided_at
                .as_deref()
                .map(|raw| parse_timestamp(raw, "decided_at"))
                .transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
struct AuditEventRow {
    id: String,
    actor: String,
    action: String,
    target_type: String,
    target_id: String,
    before_snapshot: Option<String>,
    after_snapshot: Option<String>,
    reason: Option<String>,
    timestamp: String,
}

impl AuditEventRow {
    fn into_entity(self) -> Result<AuditEvent> {
        Ok(AuditEvent {
            id: AuditEventId::from_string(self.id),
            actor: self.actor,
            action: parse_enum::<AuditAction>(&self.action, "action")?,
            target_type: parse_enum::<AuditTargetType>(&self.target_type, "target_type")?,
            target_id: self.target_id,
            before: self
                .before_snapshot
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            after: self
                .after_snapshot
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            reason: self.reason,
            timestamp: parse_timestamp(&self.timestamp, "timestamp")?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ScheduleRow {
    id: String,
    env_var_id: String,
    schedule: String,
    status: String,
    created_by: String,
    created_at: String,
}

impl ScheduleRow {
    fn into_entity(self) -> Result<RotationSchedule> {
        Ok(RotationSchedule {
            id: ScheduleId::from_string(self.id),
            env_var_id: EnvVarId::from_string(self.env_var_id),
            schedule: self.schedule,
            status: parse_enum::<ScheduleStatus>(&self.status, "status")?,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
struct PolicyRow {
    id: String,
    scope: String,
    require_approval: bool,
    min_approvers: i64,
    secret_ttl_days: Option<i64>,
    key_regex: String,
    value_max_kb: i64,
    reveal_justification_required: bool,
    created_by: String,
    created_at: String,
    updated_by: String,
    updated_at: String,
}

impl PolicyRow {
    fn into_entity(self) -> Result<Policy> {
        Ok(Policy {
            id: PolicyId::from_string(self.id),
            scope: parse_enum::<ScopeLevel>(&self.scope, "scope")?,
            require_approval: self.require_approval,
            min_approvers: self.min_approvers as u32,
            secret_ttl_days: self.secret_ttl_days.map(|d| d as u32),
            key_regex: self.key_regex,
            value_max_kb: self.value_max_kb as u32,
            reveal_justification_required: self.reveal_justification_required,
            created_by: self.created_by,
            created_at: parse_timestamp(&self.created_at, "created_at")?,
            updated_by: self.updated_by,
            updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
        })
    }
}

#[async_trait]
impl EnvStore for SqliteEnvStore {
    async fn create_env_var(&self, env_var: &EnvVar) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO env_vars (
                id, key, value, var_type, scope_level, scope_ref_id, tags,
                description, is_secret, status, created_by, created_at,
                updated_by, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(env_var.id.as_str())
        .bind(&env_var.key)
        .bind(&env_var.value)
        .bind(env_var.var_type.as_str())
        .bind(env_var.scope.level.as_str())
        .bind(&env_var.scope.ref_id)
        .bind(serde_json::to_string(&env_var.tags)?)
        .bind(&env_var.description)
        .bind(env_var.is_secret)
        .bind(env_var.status.as_str())
        .bind(&env_var.created_by)
        .bind(env_var.created_at.to_rfc3339())
        .bind(&env_var.updated_by)
        .bind(env_var.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                EnvkeepError::already_exists(
                    format!("Environment variable '{}' already exists", env_var.unique_key()),
                    "env_var",
                )
            }
            _ => EnvkeepError::Database {
                source: e,
                context: "Failed to insert environment variable".to_string(),
            },
        })?;
        Ok(())
    }

    async fn get_env_var(&self, id: &EnvVarId) -> Result<Option<EnvVar>> {
        let row = sqlx::query_as::<_, EnvVarRow>("SELECT * FROM env_vars WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(EnvVarRow::into_entity).transpose()
    }

    async fn get_by_scoped_key(
        &self,
        level: ScopeLevel,
        ref_id: &str,
        key: &str,
    ) -> Result<Option<EnvVar>> {
        let row = sqlx::query_as::<_, EnvVarRow>(
            "SELECT * FROM env_vars WHERE scope_level = ? AND scope_ref_id = ? AND key = ?",
        )
        .bind(level.as_str())
        .bind(ref_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(EnvVarRow::into_entity).transpose()
    }

    async fn update_env_var(&self, env_var: &EnvVar) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE env_vars SET
                value = ?, var_type = ?, tags = ?, description = ?,
                is_secret = ?, status = ?, updated_by = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&env_var.value)
        .bind(env_var.var_type.as_str())
        .bind(serde_json::to_string(&env_var.tags)?)
        .bind(&env_var.description)
        .bind(env_var.is_secret)
        .bind(env_var.status.as_str())
        .bind(&env_var.updated_by)
        .bind(env_var.updated_at.to_rfc3339())
        .bind(env_var.id.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EnvkeepError::not_found("env_var", env_var.id.as_str()));
        }
        Ok(())
    }

    async fn delete_env_var(&self, id: &EnvVarId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM env_vars WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_env_vars(&self, filter: &EnvVarFilter, page: Page) -> Result<Vec<EnvVar>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM env_vars WHERE 1 = 1");
        push_env_var_filter(&mut builder, filter);
        builder.push(" ORDER BY scope_level, scope_ref_id, key LIMIT ");
        builder.push_bind(page.size as i64);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset() as i64);

        let rows: Vec<EnvVarRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(EnvVarRow::into_entity).collect()
    }

    async fn count_env_vars(&self, filter: &EnvVarFilter) -> Result<i64> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM env_vars WHERE 1 = 1");
        push_env_var_filter(&mut builder, filter);
        let count: (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count.0)
    }

    async fn append_version(&self, version: &EnvVarVersion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO env_var_versions (
                id, env_var_id, version, diff, checksum, author, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version.id.as_str())
        .bind(version.env_var_id.as_str())
        .bind(version.version)
        .bind(serde_json::to_string(&version.diff)?)
        .bind(&version.checksum)
        .bind(&version.author)
        .bind(version.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| EnvkeepError::Database {
            source: e,
            context: "Failed to append version record".to_string(),
        })?;
        Ok(())
    }

    async fn list_versions(&self, env_var_id: &EnvVarId) -> Result<Vec<EnvVarVersion>> {
        let rows: Vec<VersionRow> = sqlx::query_as(
            "SELECT * FROM env_var_versions WHERE env_var_id = ? ORDER BY version ASC",
        )
        .bind(env_var_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(VersionRow::into_entity).collect()
    }

    async fn next_version(&self, env_var_id: &EnvVarId) -> Result<i64> {
        // The UNIQUE (env_var_id, version) constraint catches two writers
        // racing past this read.
        let row: (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM env_var_versions WHERE env_var_id = ?",
        )
        .bind(env_var_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn create_release(&self, release: &Release) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO releases (
                id, service_id, environment, title, description, status,
                changes, created_by, created_at, applied_by, applied_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(release.id.as_str())
        .bind(&release.service_id)
        .bind(&release.environment)
        .bind(&release.title)
        .bind(&release.description)
        .bind(release.status.as_str())
        .bind(serde_json::to_string(&release.changes)?)
        .bind(&release.created_by)
        .bind(release.created_at.to_rfc3339())
        .bind(&release.applied_by)
        .bind(release.applied_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_release(&self, id: &ReleaseId) -> Result<Option<Release>> {
        let row = sqlx::query_as::<_, ReleaseRow>("SELECT * FROM releases WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReleaseRow::into_entity).transpose()
    }

    async fn update_release(&self, release: &Release) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE releases SET
                title = ?, description = ?, status = ?, changes = ?,
                applied_by = ?, applied_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&release.title)
        .bind(&release.description)
        .bind(release.status.as_str())
        .bind(serde_json::to_string(&release.changes)?)
        .bind(&release.applied_by)
        .bind(release.applied_at.map(|t| t.to_rfc3339()))
        .bind(release.id.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EnvkeepError::not_found("release", release.id.as_str()));
        }
        Ok(())
    }

    async fn list_releases(&self, filter: &ReleaseFilter, page: Page) -> Result<Vec<Release>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM releases WHERE 1 = 1");
        if let Some(service_id) = &filter.service_id {
            builder.push(" AND service_id = ");
            builder.push_bind(service_id.clone());
        }
        if let Some(environment) = &filter.environment {
            builder.push(" AND environment = ");
            builder.push_bind(environment.clone());
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(page.size as i64);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset() as i64);

        let rows: Vec<ReleaseRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(ReleaseRow::into_entity).collect()
    }

    async fn create_approval(&self, approval: &Approval) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO approvals (
                id, release_id, approver_id, decision, comment, decided_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(approval.id.as_str())
        .bind(approval.release_id.as_str())
        .bind(&approval.approver_id)
        .bind(approval.decision.as_str())
        .bind(&approval.comment)
        .bind(approval.decided_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_approvals(&self, release_id: &ReleaseId) -> Result<Vec<Approval>> {
        let rows: Vec<ApprovalRow> =
            sqlx::query_as("SELECT * FROM approvals WHERE release_id = ? ORDER BY decided_at ASC")
                .bind(release_id.as_str())
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(ApprovalRow::into_entity).collect()
    }

    async fn get_approval(&self, id: &ApprovalId) -> Result<Option<Approval>> {
        let row = sqlx::query_as::<_, ApprovalRow>("SELECT * FROM approvals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(ApprovalRow::into_entity).transpose()
    }

    async fn append_audit_event(&self, event: &AuditEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, actor, action, target_type, target_id,
                before_snapshot, after_snapshot, reason, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.as_str())
        .bind(&event.actor)
        .bind(event.action.as_str())
        .bind(event.target_type.as_str())
        .bind(&event.target_id)
        .bind(event.before.as_ref().map(serde_json::to_string).transpose()?)
        .bind(event.after.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&event.reason)
        .bind(event.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_audit_events(
        &self,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Vec<AuditEvent>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM audit_events WHERE 1 = 1");
        if let Some(actor) = &filter.actor {
            builder.push(" AND actor = ");
            builder.push_bind(actor.clone());
        }
        if let Some(action) = filter.action {
            builder.push(" AND action = ");
            builder.push_bind(action.as_str());
        }
        if let Some(target_type) = filter.target_type {
            builder.push(" AND target_type = ");
            builder.push_bind(target_type.as_str());
        }
        if let Some(target_id) = &filter.target_id {
            builder.push(" AND target_id = ");
            builder.push_bind(target_id.clone());
        }
        builder.push(" ORDER BY timestamp DESC LIMIT ");
        builder.push_bind(page.size as i64);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset() as i64);

        let rows: Vec<AuditEventRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(AuditEventRow::into_entity).collect()
    }

    async fn create_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rotation_schedules (
                id, env_var_id, schedule, status, created_by, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(schedule.id.as_str())
        .bind(schedule.env_var_id.as_str())
        .bind(&schedule.schedule)
        .bind(schedule.status.as_str())
        .bind(&schedule.created_by)
        .bind(schedule.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_rotation_schedules(
        &self,
        env_var_id: Option<&EnvVarId>,
    ) -> Result<Vec<RotationSchedule>> {
        let rows: Vec<ScheduleRow> = match env_var_id {
            Some(id) => {
                sqlx::query_as(
                    "SELECT * FROM rotation_schedules WHERE env_var_id = ? ORDER BY created_at",
                )
                .bind(id.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM rotation_schedules ORDER BY created_at")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(ScheduleRow::into_entity).collect()
    }

    async fn update_rotation_schedule(&self, schedule: &RotationSchedule) -> Result<()> {
        let result = sqlx::query("UPDATE rotation_schedules SET schedule = ?, status = ? WHERE id = ?")
            .bind(&schedule.schedule)
            .bind(schedule.status.as_str())
            .bind(schedule.id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EnvkeepError::not_found("rotation_schedule", schedule.id.as_str()));
        }
        Ok(())
    }

    async fn create_policy(&self, policy: &Policy) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO policies (
                id, scope, require_approval, min_approvers, secret_ttl_days,
                key_regex, value_max_kb, reveal_justification_required,
                created_by, created_at, updated_by, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(policy.id.as_str())
        .bind(policy.scope.as_str())
        .bind(policy.require_approval)
        .bind(policy.min_approvers as i64)
        .bind(policy.secret_ttl_days.map(|d| d as i64))
        .bind(&policy.key_regex)
        .bind(policy.value_max_kb as i64)
        .bind(policy.reveal_justification_required)
        .bind(&policy.created_by)
        .bind(policy.created_at.to_rfc3339())
        .bind(&policy.updated_by)
        .bind(policy.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_policies(&self) -> Result<Vec<Policy>> {
        let rows: Vec<PolicyRow> =
            sqlx::query_as("SELECT * FROM policies ORDER BY created_at").fetch_all(&self.pool).await?;
        rows.into_iter().map(PolicyRow::into_entity).collect()
    }
}

fn push_env_var_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &EnvVarFilter) {
    if let Some(level) = filter.scope_level {
        builder.push(" AND scope_level = ");
        builder.push_bind(level.as_str());
    }
    if let Some(ref_id) = &filter.scope_ref_id {
        builder.push(" AND scope_ref_id = ");
        builder.push_bind(ref_id.clone());
    }
    if let Some(fragment) = &filter.key_contains {
        builder.push(" AND key LIKE ");
        builder.push_bind(format!("%{}%", fragment));
    }
    if let Some(tag) = &filter.tag {
        // Tags are stored as a JSON array of strings
        builder.push(" AND tags LIKE ");
        builder.push_bind(format!("%\"{}\"%", tag));
    }
    if let Some(var_type) = filter.var_type {
        builder.push(" AND var_type = ");
        builder.push_bind(var_type.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
}
