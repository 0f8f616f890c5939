//! Embedded database schema
//!
//! The schema enforces the two uniqueness rules the use cases rely on:
//! one key per (scope_level, scope_ref_id) and one row per
//! (env_var_id, version). Versions and audit events carry no foreign keys
//! so history survives entity deletion.

use crate::errors::{EnvkeepError, Result};
use sqlx::{Pool, Sqlite};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS env_vars (
    id            TEXT PRIMARY KEY,
    key           TEXT NOT NULL,
    value         TEXT NOT NULL,
    var_type      TEXT NOT NULL,
    scope_level   TEXT NOT NULL,
    scope_ref_id  TEXT NOT NULL,
    tags          TEXT NOT NULL DEFAULT '[]',
    description   TEXT,
    is_secret     INTEGER NOT NULL DEFAULT 0,
    status        TEXT NOT NULL DEFAULT 'ACTIVE',
    created_by    TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_by    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (scope_level, scope_ref_id, key)
);

CREATE INDEX IF NOT EXISTS idx_env_vars_scope
    ON env_vars (scope_level, scope_ref_id);

CREATE TABLE IF NOT EXISTS env_var_versions (
    id          TEXT PRIMARY KEY,
    env_var_id  TEXT NOT NULL,
    version     INTEGER NOT NULL,
    diff        TEXT NOT NULL,
    checksum    TEXT NOT NULL,
    author      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (env_var_id, version)
);

CREATE INDEX IF NOT EXISTS idx_env_var_versions_env_var
    ON env_var_versions (env_var_id);

CREATE TABLE IF NOT EXISTS releases (
    id           TEXT PRIMARY KEY,
    service_id   TEXT NOT NULL,
    environment  TEXT NOT NULL,
    title        TEXT NOT NULL,
    description  TEXT,
    status       TEXT NOT NULL,
    changes      TEXT NOT NULL,
    created_by   TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    applied_by   TEXT,
    applied_at   TEXT
);

CREATE INDEX IF NOT EXISTS idx_releases_environment
    ON releases (environment, status);

CREATE TABLE IF NOT EXISTS approvals (
    id           TEXT PRIMARY KEY,
    release_id   TEXT NOT NULL REFERENCES releases (id),
    approver_id  TEXT NOT NULL,
    decision     TEXT NOT NULL,
    comment      TEXT,
    decided_at   TEXT
);

CREATE INDEX IF NOT EXISTS idx_approvals_release
    ON approvals (release_id);

CREATE TABLE IF NOT EXISTS audit_events (
    id               TEXT PRIMARY KEY,
    actor            TEXT NOT NULL,
    action           TEXT NOT NULL,
    target_type      TEXT NOT NULL,
    target_id        TEXT NOT NULL,
    before_snapshot  TEXT,
    after_snapshot   TEXT,
    reason           TEXT,
    timestamp        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_events_target
    ON audit_events (target_type, target_id);

CREATE TABLE IF NOT EXISTS rotation_schedules (
    id          TEXT PRIMARY KEY,
    env_var_id  TEXT NOT NULL,
    schedule    TEXT NOT NULL,
    status      TEXT NOT NULL,
    created_by  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rotation_schedules_env_var
    ON rotation_schedules (env_var_id);

CREATE TABLE IF NOT EXISTS policies (
    id                             TEXT PRIMARY KEY,
    scope                          TEXT NOT NULL,
    require_approval               INTEGER NOT NULL DEFAULT 0,
    min_approvers                  INTEGER NOT NULL DEFAULT 1,
    secret_ttl_days                INTEGER,
    key_regex                      TEXT NOT NULL,
    value_max_kb                   INTEGER NOT NULL,
    reveal_justification_required  INTEGER NOT NULL DEFAULT 0,
    created_by                     TEXT NOT NULL,
    created_at                     TEXT NOT NULL,
    updated_by                     TEXT NOT NULL,
    updated_at                     TEXT NOT NULL
);
"#;

/// Apply the embedded schema, idempotently
pub async fn apply_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await.map_err(|e| EnvkeepError::Database {
        source: e,
        context: "Failed to apply database schema".to_string(),
    })?;
    tracing::debug!("Database schema applied");
    Ok(())
}
