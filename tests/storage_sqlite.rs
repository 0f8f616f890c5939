//! SQLite store round-trips: every entity in, same entity out, plus the
//! schema-enforced uniqueness rules.

use chrono::Utc;
use envkeep::domain::{
    Approval, ApprovalDecision, ApprovalId, AuditAction, AuditEvent, AuditEventId,
    AuditTargetType, EnvVar, EnvVarId, EnvVarStatus, EnvVarType, EnvVarVersion, Policy, PolicyId,
    Release, ReleaseChange, ReleaseId, ReleaseStatus, RotationSchedule, ScheduleId,
    ScheduleStatus, ScopeLevel, ScopeRef, VersionDiff, VersionId,
};
use envkeep::ports::{AuditFilter, EnvStore, EnvVarFilter, Page, ReleaseFilter};
use envkeep::storage::{create_test_pool, SqliteEnvStore};
use envkeep::EnvkeepError;
use serde_json::json;

async fn store() -> SqliteEnvStore {
    let pool = create_test_pool().await.unwrap();
    SqliteEnvStore::new(pool)
}

fn sample_var(key: &str, scope: ScopeRef) -> EnvVar {
    let now = Utc::now();
    EnvVar::new(
        EnvVarId::new(),
        key.to_string(),
        "value-1".to_string(),
        EnvVarType::String,
        scope,
        vec!["db".to_string()],
        Some("a description".to_string()),
        false,
        EnvVarStatus::Active,
        "alice".to_string(),
        now,
        "alice".to_string(),
        now,
    )
    .unwrap()
}

#[tokio::test]
async fn env_var_round_trip() {
    let store = store().await;
    let var = sample_var("DATABASE_URL", ScopeRef::env("staging"));
    store.create_env_var(&var).await.unwrap();

    let loaded = store.get_env_var(&var.id).await.unwrap().unwrap();
    assert_eq!(loaded.key, var.key);
    assert_eq!(loaded.tags, var.tags);
    assert_eq!(loaded.scope, var.scope);
    assert_eq!(loaded.created_at.timestamp(), var.created_at.timestamp());

    let by_key = store
        .get_by_scoped_key(ScopeLevel::Env, "staging", "DATABASE_URL")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_key.id, var.id);
}

#[tokio::test]
async fn scoped_key_uniqueness_enforced_by_schema() {
    let store = store().await;
    let var = sample_var("DUP_KEY", ScopeRef::env("dev"));
    store.create_env_var(&var).await.unwrap();

    let mut dup = sample_var("DUP_KEY", ScopeRef::env("dev"));
    dup.id = EnvVarId::new();
    let err = store.create_env_var(&dup).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::AlreadyExists { .. }));

    // Same key in another scope is allowed
    let other = sample_var("DUP_KEY", ScopeRef::env("prod"));
    store.create_env_var(&other).await.unwrap();
}

#[tokio::test]
async fn update_and_delete() {
    let store = store().await;
    let mut var = sample_var("MUTABLE", ScopeRef::global());
    store.create_env_var(&var).await.unwrap();

    var.value = "value-2".to_string();
    var.status = EnvVarStatus::Deprecated;
    store.update_env_var(&var).await.unwrap();
    let loaded = store.get_env_var(&var.id).await.unwrap().unwrap();
    assert_eq!(loaded.value, "value-2");
    assert_eq!(loaded.status, EnvVarStatus::Deprecated);

    assert!(store.delete_env_var(&var.id).await.unwrap());
    assert!(!store.delete_env_var(&var.id).await.unwrap());
    assert!(store.get_env_var(&var.id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_filters_and_pagination() {
    let store = store().await;
    for i in 0..5 {
        let var = sample_var(&format!("KEY_{}", i), ScopeRef::env("dev"));
        store.create_env_var(&var).await.unwrap();
    }
    let other = sample_var("KEY_OTHER", ScopeRef::env("prod"));
    store.create_env_var(&other).await.unwrap();

    let filter = EnvVarFilter::for_scope(ScopeLevel::Env, "dev");
    assert_eq!(store.count_env_vars(&filter).await.unwrap(), 5);

    let first_page = store.list_env_vars(&filter, Page::new(1, 2)).await.unwrap();
    assert_eq!(first_page.len(), 2);
    let third_page = store.list_env_vars(&filter, Page::new(3, 2)).await.unwrap();
    assert_eq!(third_page.len(), 1);

    let by_fragment = EnvVarFilter {
        key_contains: Some("OTHER".to_string()),
        ..Default::default()
    };
    let matched = store.list_env_vars(&by_fragment, Page::default()).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].key, "KEY_OTHER");

    let by_tag = EnvVarFilter { tag: Some("db".to_string()), ..Default::default() };
    assert_eq!(store.count_env_vars(&by_tag).await.unwrap(), 6);
}

#[tokio::test]
async fn version_records_and_numbering() {
    let store = store().await;
    let var = sample_var("VERSIONED", ScopeRef::global());
    store.create_env_var(&var).await.unwrap();

    assert_eq!(store.next_version(&var.id).await.unwrap(), 1);

    let mut diff = VersionDiff::new();
    diff.record("value", "value-1", "value-2");
    let version = EnvVarVersion::new(
        VersionId::new(),
        var.id.clone(),
        1,
        diff,
        "alice".to_string(),
        Utc::now(),
    );
    store.append_version(&version).await.unwrap();
    assert_eq!(store.next_version(&var.id).await.unwrap(), 2);

    let versions = store.list_versions(&var.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].diff, version.diff);
    assert!(versions[0].verify_checksum());

    // Duplicate version number trips the unique constraint
    let mut dup = version.clone();
    dup.id = VersionId::new();
    assert!(store.append_version(&dup).await.is_err());
}

#[tokio::test]
async fn version_history_survives_entity_deletion() {
    let store = store().await;
    let var = sample_var("EPHEMERAL", ScopeRef::global());
    store.create_env_var(&var).await.unwrap();

    let mut diff = VersionDiff::new();
    diff.record("value", "a", "b");
    let version = EnvVarVersion::new(
        VersionId::new(),
        var.id.clone(),
        1,
        diff,
        "alice".to_string(),
        Utc::now(),
    );
    store.append_version(&version).await.unwrap();

    store.delete_env_var(&var.id).await.unwrap();
    assert_eq!(store.list_versions(&var.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn release_and_approval_round_trip() {
    let store = store().await;
    let release = Release::new(
        ReleaseId::new(),
        "billing".to_string(),
        "production".to_string(),
        "Rotate credentials".to_string(),
        Some("quarterly rotation".to_string()),
        ReleaseStatus::PendingApproval,
        vec![ReleaseChange::create("DB_PASSWORD", "x", EnvVarType::Secret)],
        "alice".to_string(),
        Utc::now(),
    )
    .unwrap();
    store.create_release(&release).await.unwrap();

    let loaded = store.get_release(&release.id).await.unwrap().unwrap();
    assert_eq!(loaded.changes, release.changes);
    assert_eq!(loaded.status, ReleaseStatus::PendingApproval);
    assert!(loaded.applied_at.is_none());

    let approval = Approval::new(
        ApprovalId::new(),
        release.id.clone(),
        "bob".to_string(),
        ApprovalDecision::Approved,
        Some("lgtm".to_string()),
        Some(Utc::now()),
    )
    .unwrap();
    store.create_approval(&approval).await.unwrap();

    let approvals = store.list_approvals(&release.id).await.unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].decision, ApprovalDecision::Approved);
    assert!(store.get_approval(&approval.id).await.unwrap().is_some());

    let mut applied = loaded;
    applied.status = ReleaseStatus::Applied;
    applied.applied_by = Some("alice".to_string());
    applied.applied_at = Some(Utc::now());
    store.update_release(&applied).await.unwrap();

    let filter = ReleaseFilter {
        environment: Some("production".to_string()),
        status: Some(ReleaseStatus::Applied),
        ..Default::default()
    };
    let matched = store.list_releases(&filter, Page::default()).await.unwrap();
    assert_eq!(matched.len(), 1);
    assert!(matched[0].applied_at.is_some());
}

#[tokio::test]
async fn audit_event_round_trip_and_filtering() {
    let store = store().await;
    let event = AuditEvent::new(
        AuditEventId::new(),
        "alice".to_string(),
        AuditAction::Update,
        AuditTargetType::EnvVar,
        "ev-1".to_string(),
        Some(json!({"value": "***"})),
        Some(json!({"value": "***", "description": "new"})),
        Some("routine change".to_string()),
        Utc::now(),
    )
    .unwrap();
    store.append_audit_event(&event).await.unwrap();

    let filter = AuditFilter {
        actor: Some("alice".to_string()),
        action: Some(AuditAction::Update),
        ..Default::default()
    };
    let events = store.list_audit_events(&filter, Page::default()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].before, event.before);
    assert_eq!(events[0].after, event.after);

    let none = AuditFilter { actor: Some("mallory".to_string()), ..Default::default() };
    assert!(store.list_audit_events(&none, Page::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn rotation_schedule_round_trip() {
    let store = store().await;
    let mut schedule = RotationSchedule {
        id: ScheduleId::new(),
        env_var_id: EnvVarId::new(),
        schedule: "0 0 1 * *".to_string(),
        status: ScheduleStatus::Active,
        created_by: "alice".to_string(),
        created_at: Utc::now(),
    };
    store.create_rotation_schedule(&schedule).await.unwrap();

    let listed = store.list_rotation_schedules(Some(&schedule.env_var_id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].schedule, "0 0 1 * *");

    schedule.status = ScheduleStatus::Paused;
    store.update_rotation_schedule(&schedule).await.unwrap();
    let listed = store.list_rotation_schedules(None).await.unwrap();
    assert_eq!(listed[0].status, ScheduleStatus::Paused);
}

#[tokio::test]
async fn file_backed_store_persists_across_pools() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("envkeep.db");
    let config = envkeep::config::DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 2,
        connect_timeout_seconds: 5,
    };

    let var = sample_var("PERSISTED", ScopeRef::global());
    {
        let pool = envkeep::storage::create_pool(&config).await.unwrap();
        let store = SqliteEnvStore::new(pool);
        store.create_env_var(&var).await.unwrap();
    }

    let pool = envkeep::storage::create_pool(&config).await.unwrap();
    let store = SqliteEnvStore::new(pool);
    let loaded = store.get_env_var(&var.id).await.unwrap().unwrap();
    assert_eq!(loaded.key, "PERSISTED");
}

#[tokio::test]
async fn policy_round_trip() {
    let store = store().await;
    let policy = Policy::new(
        PolicyId::new(),
        ScopeLevel::Env,
        true,
        2,
        Some(90),
        r"^[A-Z0-9_]{1,100}$".to_string(),
        1024,
        true,
        "admin".to_string(),
        Utc::now(),
    )
    .unwrap();
    store.create_policy(&policy).await.unwrap();

    let policies = store.list_policies().await.unwrap();
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].scope, ScopeLevel::Env);
    assert_eq!(policies[0].min_approvers, 2);
    assert_eq!(policies[0].secret_ttl_days, Some(90));
    assert!(policies[0].reveal_justification_required);
}
