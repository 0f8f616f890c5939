//! End-to-end env var lifecycle: create, update, version history, delete,
//! environment diff, and rollback, all against the in-memory store.

use std::sync::Arc;

use envkeep::domain::{AuditAction, DiffEntry, EnvVarStatus, EnvVarType, ScopeRef, MASKED};
use envkeep::ports::{AuditFilter, EnvStore, EnvVarFilter, FixedClock, Page, SequentialIds};
use envkeep::services::{
    CreateEnvVarRequest, EnvVarService, SecretEncryption, UpdateEnvVarRequest,
};
use envkeep::storage::MemoryEnvStore;
use envkeep::EnvkeepError;
use proptest::prelude::*;

fn service() -> (EnvVarService, Arc<MemoryEnvStore>) {
    let store = Arc::new(MemoryEnvStore::new());
    let service = EnvVarService::new(
        store.clone(),
        Arc::new(SecretEncryption::for_testing()),
        Arc::new(FixedClock::at_epoch_day(20_000)),
        Arc::new(SequentialIds::new()),
    );
    (service, store)
}

#[tokio::test]
async fn create_then_update_description_records_version_one() {
    let (service, _) = service();

    let request = CreateEnvVarRequest::new(
        "DATABASE_URL",
        "postgres://db.internal/app",
        EnvVarType::String,
        ScopeRef::env("staging"),
    );
    let var = service.create(request, "alice").await.unwrap();
    assert_eq!(var.status, EnvVarStatus::Active);

    // Creation itself writes no version
    assert!(service.list_versions(&var.id).await.unwrap().is_empty());

    let update = UpdateEnvVarRequest {
        description: Some("primary database".to_string()),
        ..Default::default()
    };
    service.update(&var.id, update, "alice").await.unwrap();

    let versions = service.list_versions(&var.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    let version = &versions[0];
    assert_eq!(version.version, 1);
    // Only the changed field enters the diff
    assert!(version.diff.contains("description"));
    assert!(!version.diff.contains("value"));
    assert!(version.verify_checksum());
}

#[tokio::test]
async fn duplicate_scoped_key_conflicts_but_other_scope_is_fine() {
    let (service, _) = service();

    let request = |scope: ScopeRef| {
        CreateEnvVarRequest::new("API_KEY1", "abc", EnvVarType::String, scope)
    };
    service.create(request(ScopeRef::env("dev")), "alice").await.unwrap();

    let err = service.create(request(ScopeRef::env("dev")), "alice").await.unwrap_err();
    assert!(matches!(err, EnvkeepError::AlreadyExists { .. }));

    // Same key in a different scope is a different variable
    service.create(request(ScopeRef::env("staging")), "alice").await.unwrap();
}

#[tokio::test]
async fn invalid_keys_and_values_rejected() {
    let (service, _) = service();

    for (key, value, var_type) in [
        ("lowercase", "v", EnvVarType::String),
        ("HAS SPACE", "v", EnvVarType::String),
        ("PORT", "eighty", EnvVarType::Number),
        ("FLAG", "yes", EnvVarType::Bool),
        ("CFG", "{oops", EnvVarType::Json),
    ] {
        let request =
            CreateEnvVarRequest::new(key, value, var_type, ScopeRef::global());
        let err = service.create(request, "alice").await.unwrap_err();
        assert!(
            matches!(err, EnvkeepError::Validation { .. }),
            "{}={} should fail validation",
            key,
            value
        );
    }
}

#[tokio::test]
async fn secret_create_encrypts_and_masks() {
    let (service, store) = service();

    let request = CreateEnvVarRequest::new(
        "DB_PASSWORD",
        "hunter2",
        EnvVarType::Secret,
        ScopeRef::env("staging"),
    )
    .secret();
    let var = service.create(request, "alice").await.unwrap();

    assert_ne!(var.value, "hunter2");
    assert_eq!(var.get_masked_value(), MASKED);

    // Audit snapshot never carries the plaintext or ciphertext
    let events = store
        .list_audit_events(&AuditFilter::default(), Page::default())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::Create);
    assert_eq!(events[0].after.as_ref().unwrap()["value"], MASKED);
}

#[tokio::test]
async fn secret_update_records_masked_diff() {
    let (service, _) = service();

    let request =
        CreateEnvVarRequest::new("TOKEN1", "old-secret", EnvVarType::Secret, ScopeRef::global())
            .secret();
    let var = service.create(request, "alice").await.unwrap();

    let update =
        UpdateEnvVarRequest { value: Some("new-secret".to_string()), ..Default::default() };
    service.update(&var.id, update, "alice").await.unwrap();

    let versions = service.list_versions(&var.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    assert!(versions[0].diff.get("value").unwrap().is_masked());
}

#[tokio::test]
async fn noop_update_appends_no_version() {
    let (service, _) = service();

    let request = CreateEnvVarRequest::new("HOST", "localhost", EnvVarType::String, ScopeRef::global());
    let var = service.create(request, "alice").await.unwrap();

    let update =
        UpdateEnvVarRequest { value: Some("localhost".to_string()), ..Default::default() };
    service.update(&var.id, update, "alice").await.unwrap();
    assert!(service.list_versions(&var.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_in_restricted_environment_refused_without_audit() {
    let (service, store) = service();

    let request = CreateEnvVarRequest::new(
        "CRITICAL_FLAG",
        "on",
        EnvVarType::String,
        ScopeRef::env("production"),
    );
    let var = service.create(request, "alice").await.unwrap();

    let err = service.delete(&var.id, "alice", None).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::RestrictedEnvironment { .. }));

    // Variable survives and no DELETE event was written
    assert!(service.get(&var.id).await.is_ok());
    let filter = AuditFilter { action: Some(AuditAction::Delete), ..Default::default() };
    let events = store.list_audit_events(&filter, Page::default()).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn delete_in_open_environment_audits() {
    let (service, store) = service();

    let request =
        CreateEnvVarRequest::new("TEMP_FLAG", "on", EnvVarType::String, ScopeRef::env("dev"));
    let var = service.create(request, "alice").await.unwrap();

    service.delete(&var.id, "bob", Some("cleanup".to_string())).await.unwrap();
    let err = service.get(&var.id).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::NotFound { .. }));

    let filter = AuditFilter { action: Some(AuditAction::Delete), ..Default::default() };
    let events = store.list_audit_events(&filter, Page::default()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].actor, "bob");
    assert_eq!(events[0].reason.as_deref(), Some("cleanup"));
}

#[tokio::test]
async fn list_filters_by_tag_and_type() {
    let (service, _) = service();

    let tagged = CreateEnvVarRequest::new("DB_HOST", "h", EnvVarType::String, ScopeRef::global())
        .with_tags(vec!["db".to_string()]);
    service.create(tagged, "alice").await.unwrap();
    let plain =
        CreateEnvVarRequest::new("RETRIES", "3", EnvVarType::Number, ScopeRef::global());
    service.create(plain, "alice").await.unwrap();

    let by_tag = EnvVarFilter { tag: Some("db".to_string()), ..Default::default() };
    let response = service.list(&by_tag, Page::default()).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].key, "DB_HOST");

    let by_type = EnvVarFilter { var_type: Some(EnvVarType::Number), ..Default::default() };
    let response = service.list(&by_type, Page::default()).await.unwrap();
    assert_eq!(response.total, 1);
    assert_eq!(response.items[0].key, "RETRIES");
}

#[tokio::test]
async fn diff_environments_reports_missing_and_different() {
    let (service, _) = service();

    for (env, key, value) in [
        ("env1", "A", "same"),
        ("env1", "B", "one"),
        ("env1", "C", "only-in-env1"),
        ("env2", "A", "same"),
        ("env2", "B", "two"),
        ("env2", "D", "only-in-env2"),
    ] {
        let request =
            CreateEnvVarRequest::new(key, value, EnvVarType::String, ScopeRef::env(env));
        service.create(request, "alice").await.unwrap();
    }

    let report = service.diff_environments("env1", "env2").await.unwrap();
    assert_eq!(report.missing_in_env2, vec!["C".to_string()]);
    assert_eq!(report.missing_in_env1, vec!["D".to_string()]);
    assert_eq!(report.different_values, vec!["B".to_string()]);
}

#[tokio::test]
async fn diff_environments_compares_secret_plaintext() {
    let (service, _) = service();

    // Same plaintext in both envs encrypts to different ciphertext
    for env in ["env1", "env2"] {
        let request =
            CreateEnvVarRequest::new("SHARED_TOKEN", "same-plain", EnvVarType::Secret, ScopeRef::env(env))
                .secret();
        service.create(request, "alice").await.unwrap();
    }

    let report = service.diff_environments("env1", "env2").await.unwrap();
    assert!(report.different_values.is_empty());
}

#[tokio::test]
async fn rollback_restores_prior_state() {
    let (service, store) = service();

    let request =
        CreateEnvVarRequest::new("TIMEOUT", "30", EnvVarType::Number, ScopeRef::env("dev"));
    let var = service.create(request, "alice").await.unwrap();

    service
        .update(
            &var.id,
            UpdateEnvVarRequest { value: Some("60".to_string()), ..Default::default() },
            "alice",
        )
        .await
        .unwrap();
    service
        .update(
            &var.id,
            UpdateEnvVarRequest { value: Some("90".to_string()), ..Default::default() },
            "alice",
        )
        .await
        .unwrap();

    let rolled = service.rollback_to_version(&var.id, 1, "bob").await.unwrap();
    assert_eq!(rolled.value, "60");

    // Rollback is itself a new version carrying a marker
    let versions = service.list_versions(&var.id).await.unwrap();
    assert_eq!(versions.len(), 3);
    let last = versions.last().unwrap();
    assert_eq!(last.version, 3);
    assert_eq!(last.diff.get("rollback_to"), Some(&DiffEntry::marker(1)));

    let filter = AuditFilter { action: Some(AuditAction::Rollback), ..Default::default() };
    let events = store.list_audit_events(&filter, Page::default()).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn rollback_across_masked_history_refused() {
    let (service, _) = service();

    let request =
        CreateEnvVarRequest::new("API_SECRET", "v1", EnvVarType::Secret, ScopeRef::global())
            .secret();
    let var = service.create(request, "alice").await.unwrap();

    service
        .update(
            &var.id,
            UpdateEnvVarRequest {
                description: Some("first".to_string()),
                ..Default::default()
            },
            "alice",
        )
        .await
        .unwrap();
    service
        .update(
            &var.id,
            UpdateEnvVarRequest { value: Some("v2".to_string()), ..Default::default() },
            "alice",
        )
        .await
        .unwrap();

    let err = service.rollback_to_version(&var.id, 1, "alice").await.unwrap_err();
    assert!(matches!(err, EnvkeepError::Validation { .. }));
}

#[tokio::test]
async fn rollback_to_unknown_version_rejected() {
    let (service, _) = service();
    let request = CreateEnvVarRequest::new("K1", "v", EnvVarType::String, ScopeRef::global());
    let var = service.create(request, "alice").await.unwrap();
    let err = service.rollback_to_version(&var.id, 5, "alice").await.unwrap_err();
    assert!(matches!(err, EnvkeepError::Validation { .. }));
}

proptest! {
    #[test]
    fn valid_keys_accepted(key in "[A-Z0-9_]{1,100}") {
        prop_assert!(envkeep::domain::validate_key(&key).is_ok());
    }

    #[test]
    fn keys_with_forbidden_chars_rejected(key in "[a-z ,.!@#$%^&*()-]{1,40}") {
        prop_assert!(envkeep::domain::validate_key(&key).is_err());
    }

    #[test]
    fn overlong_keys_rejected(key in "[A-Z0-9_]{101,150}") {
        prop_assert!(envkeep::domain::validate_key(&key).is_err());
    }
}
