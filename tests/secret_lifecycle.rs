//! Secret lifecycle: bounded reveal, justification policy, rotation with
//! masked history, and rotation schedules.

use std::sync::Arc;

use chrono::{Duration, Utc};
use envkeep::domain::{
    AuditAction, EnvVarType, Policy, PolicyId, ScheduleStatus, ScopeLevel, ScopeRef, MASKED,
};
use envkeep::ports::{AuditFilter, Clock, EnvStore, FixedClock, NullNotifier, Page, SequentialIds};
use envkeep::services::{
    CreateEnvVarRequest, EnvVarService, SecretEncryption, SecretService,
    DEFAULT_REVEAL_TTL_SECONDS, MAX_REVEAL_TTL_SECONDS,
};
use envkeep::storage::MemoryEnvStore;
use envkeep::EnvkeepError;

struct Harness {
    store: Arc<MemoryEnvStore>,
    secrets: SecretService,
    env_vars: EnvVarService,
    clock: Arc<FixedClock>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryEnvStore::new());
    let cipher = Arc::new(SecretEncryption::for_testing());
    let clock = Arc::new(FixedClock::at_epoch_day(20_000));
    let ids = Arc::new(SequentialIds::new());
    let secrets = SecretService::new(
        store.clone(),
        cipher.clone(),
        clock.clone(),
        ids.clone(),
        Arc::new(NullNotifier),
    );
    let env_vars = EnvVarService::new(store.clone(), cipher, clock.clone(), ids);
    Harness { store, secrets, env_vars, clock }
}

impl Harness {
    async fn create_secret(&self, key: &str, plaintext: &str) -> envkeep::domain::EnvVar {
        let request =
            CreateEnvVarRequest::new(key, plaintext, EnvVarType::Secret, ScopeRef::env("staging"))
                .secret();
        self.env_vars.create(request, "alice").await.unwrap()
    }
}

#[tokio::test]
async fn reveal_returns_plaintext_with_default_ttl() {
    let h = harness();
    let var = h.create_secret("DB_PASSWORD", "hunter2").await;

    let revealed = h.secrets.reveal(&var.id, "bob", None, None).await.unwrap();
    assert_eq!(revealed.value, "hunter2");
    assert_eq!(
        revealed.expires_at - revealed.revealed_at,
        Duration::seconds(i64::from(DEFAULT_REVEAL_TTL_SECONDS))
    );
    assert_eq!(revealed.revealed_at, h.clock.now());
}

#[tokio::test]
async fn reveal_ttl_bounds_enforced() {
    let h = harness();
    let var = h.create_secret("API_TOKEN", "tok").await;

    for bad_ttl in [0, MAX_REVEAL_TTL_SECONDS + 1] {
        let err = h.secrets.reveal(&var.id, "bob", None, Some(bad_ttl)).await.unwrap_err();
        assert!(matches!(err, EnvkeepError::Validation { .. }), "ttl {} should fail", bad_ttl);
    }

    let revealed =
        h.secrets.reveal(&var.id, "bob", None, Some(MAX_REVEAL_TTL_SECONDS)).await.unwrap();
    assert_eq!(revealed.expires_at - revealed.revealed_at, Duration::seconds(300));
}

#[tokio::test]
async fn reveal_non_secret_refused() {
    let h = harness();
    let request =
        CreateEnvVarRequest::new("PLAIN_HOST", "localhost", EnvVarType::String, ScopeRef::global());
    let var = h.env_vars.create(request, "alice").await.unwrap();

    let err = h.secrets.reveal(&var.id, "bob", None, None).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::NotSecret { .. }));
}

#[tokio::test]
async fn reveal_audit_carries_ttl_and_justification_but_no_value() {
    let h = harness();
    let var = h.create_secret("SIGNING_KEY", "super-plain").await;

    h.secrets
        .reveal(&var.id, "bob", Some("incident 42".to_string()), Some(60))
        .await
        .unwrap();

    let filter = AuditFilter { action: Some(AuditAction::Reveal), ..Default::default() };
    let events = h.store.list_audit_events(&filter, Page::default()).await.unwrap();
    assert_eq!(events.len(), 1);
    let after = events[0].after.as_ref().unwrap();
    assert_eq!(after["ttl_seconds"], 60);
    assert_eq!(after["justification"], "incident 42");
    assert!(!after.to_string().contains("super-plain"));
}

#[tokio::test]
async fn policy_demands_justification() {
    let h = harness();
    let policy = Policy::new(
        PolicyId::new(),
        ScopeLevel::Global,
        false,
        1,
        None,
        r"^[A-Z0-9_]{1,100}$".to_string(),
        1024,
        true,
        "admin".to_string(),
        Utc::now(),
    )
    .unwrap();
    h.store.create_policy(&policy).await.unwrap();

    let var = h.create_secret("GUARDED_KEY", "plain").await;

    let err = h.secrets.reveal(&var.id, "bob", None, None).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::Validation { .. }));
    let err = h.secrets.reveal(&var.id, "bob", Some("  ".to_string()), None).await.unwrap_err();
    assert!(matches!(err, EnvkeepError::Validation { .. }));

    h.secrets.reveal(&var.id, "bob", Some("debugging".to_string()), None).await.unwrap();
}

#[tokio::test]
async fn rotation_reencrypts_and_masks_history() {
    let h = harness();
    let var = h.create_secret("ROTATED_KEY", "old-plain").await;
    let old_ciphertext = var.value.clone();

    let rotated = h.secrets.rotate(&var.id, "new-plain", "alice").await.unwrap();
    assert_ne!(rotated.value, old_ciphertext);

    let revealed = h.secrets.reveal(&var.id, "alice", None, None).await.unwrap();
    assert_eq!(revealed.value, "new-plain");

    // One version: masked value change plus the rotation marker
    let versions = h.env_vars.list_versions(&var.id).await.unwrap();
    assert_eq!(versions.len(), 1);
    let diff = &versions[0].diff;
    assert!(diff.get("value").unwrap().is_masked());
    assert_eq!(diff.get("rotation"), Some(&envkeep::domain::DiffEntry::marker(true)));
    assert!(!versions[0].diff.canonical_json().contains("old-plain"));
    assert!(!versions[0].diff.canonical_json().contains("new-plain"));
}

#[tokio::test]
async fn rotate_non_secret_refused() {
    let h = harness();
    let request =
        CreateEnvVarRequest::new("NOT_SECRET", "v", EnvVarType::String, ScopeRef::global());
    let var = h.env_vars.create(request, "alice").await.unwrap();
    let err = h.secrets.rotate(&var.id, "new", "alice").await.unwrap_err();
    assert!(matches!(err, EnvkeepError::NotSecret { .. }));
}

#[tokio::test]
async fn schedule_rotation_records_active_schedule() {
    let h = harness();
    let var = h.create_secret("SCHEDULED_KEY", "plain").await;

    let schedule = h.secrets.schedule_rotation(&var.id, "0 0 1 * *", "alice").await.unwrap();
    assert_eq!(schedule.status, ScheduleStatus::Active);
    assert_eq!(schedule.env_var_id, var.id);

    let listed = h.secrets.list_schedules(&var.id).await.unwrap();
    assert_eq!(listed.len(), 1);

    let paused =
        h.secrets.set_schedule_status(&schedule.id, ScheduleStatus::Paused).await.unwrap();
    assert_eq!(paused.status, ScheduleStatus::Paused);
}

#[tokio::test]
async fn empty_schedule_expression_rejected() {
    let h = harness();
    let var = h.create_secret("KEY_X", "plain").await;
    let err = h.secrets.schedule_rotation(&var.id, "  ", "alice").await.unwrap_err();
    assert!(matches!(err, EnvkeepError::Validation { .. }));
}

#[tokio::test]
async fn masked_value_rendering() {
    let h = harness();
    let var = h.create_secret("MASK_ME", "plain").await;
    assert_eq!(var.get_masked_value(), MASKED);
}
