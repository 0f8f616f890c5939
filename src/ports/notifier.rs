//! Notification capability (external collaborator)
//!
//! The core calls the notifier with finished entities and accepts a boolean;
//! delivery mechanics (Slack, webhooks) live outside. A notifier failure is
//! logged and never fails the use case that triggered it.

use crate::errors::Result;
use async_trait::async_trait;

/// Outbound notifications emitted by the workflows
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask named approvers to review a pending release
    async fn send_approval_request(
        &self,
        release_id: &str,
        release_title: &str,
        environment: &str,
    ) -> Result<bool>;

    /// Announce an approval or rejection decision
    async fn send_approval_decision(
        &self,
        release_id: &str,
        decision: &str,
        approver: &str,
        comment: Option<&str>,
    ) -> Result<bool>;

    /// Announce that a release was applied
    async fn send_release_applied(
        &self,
        release_id: &str,
        release_title: &str,
        applied_by: &str,
    ) -> Result<bool>;

    /// Announce that a secret was revealed (key and justification only,
    /// never the value)
    async fn send_secret_revealed(
        &self,
        env_var_key: &str,
        revealed_by: &str,
        justification: &str,
    ) -> Result<bool>;
}

/// No-op notifier for deployments without a delivery channel, and for tests
#[derive(Debug, Clone, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_approval_request(&self, _: &str, _: &str, _: &str) -> Result<bool> {
        Ok(true)
    }

    async fn send_approval_decision(
        &self,
        _: &str,
        _: &str,
        _: &str,
        _: Option<&str>,
    ) -> Result<bool> {
        Ok(true)
    }

    async fn send_release_applied(&self, _: &str, _: &str, _: &str) -> Result<bool> {
        Ok(true)
    }

    async fn send_secret_revealed(&self, _: &str, _: &str, _: &str) -> Result<bool> {
        Ok(true)
    }
}
