//! Policy domain entity
//!
//! Scope-matching rules consulted by the release and secret workflows:
//! whether a scope requires approval, how many approvers, secret reveal
//! justification, key format, and value size caps. Matching follows the
//! scope hierarchy: a GLOBAL policy matches everything, narrower policies
//! match progressively narrower scope levels.

use crate::domain::env_var::ScopeLevel;
use crate::domain::id::PolicyId;
use crate::errors::{EnvkeepError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Scope-matching rule set for environment variable management
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    /// The broadest level this policy applies to
    pub scope: ScopeLevel,
    pub require_approval: bool,
    pub min_approvers: u32,
    pub secret_ttl_days: Option<u32>,
    pub key_regex: String,
    pub value_max_kb: u32,
    pub reveal_justification_required: bool,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_by: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Policy {
    /// Construct and validate
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PolicyId,
        scope: ScopeLevel,
        require_approval: bool,
        min_approvers: u32,
        secret_ttl_days: Option<u32>,
        key_regex: String,
        value_max_kb: u32,
        reveal_justification_required: bool,
        created_by: String,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self> {
        if value_max_kb == 0 {
            return Err(EnvkeepError::validation_field(
                "value_max_kb must be positive",
                "value_max_kb",
            ));
        }
        if let Some(ttl) = secret_ttl_days {
            if ttl == 0 {
                return Err(EnvkeepError::validation_field(
                    "secret_ttl_days must be positive",
                    "secret_ttl_days",
                ));
            }
        }
        Regex::new(&key_regex).map_err(|e| {
            EnvkeepError::validation_field(format!("Invalid key_regex: {}", e), "key_regex")
        })?;

        Ok(Self {
            id,
            scope,
            require_approval,
            min_approvers,
            secret_ttl_days,
            key_regex,
            value_max_kb,
            reveal_justification_required,
            created_by: created_by.clone(),
            created_at,
            updated_by: created_by,
            updated_at: created_at,
        })
    }

    /// Whether this policy applies to a concrete scope level.
    ///
    /// GLOBAL matches everything; PROJECT matches PROJECT; SERVICE matches
    /// PROJECT and SERVICE; ENV matches PROJECT, SERVICE and ENV.
    pub fn matches_scope(&self, scope_level: ScopeLevel) -> bool {
        match self.scope {
            ScopeLevel::Global => true,
            ScopeLevel::Project => scope_level == ScopeLevel::Project,
            ScopeLevel::Service => {
                matches!(scope_level, ScopeLevel::Project | ScopeLevel::Service)
            }
            ScopeLevel::Env => {
                matches!(scope_level, ScopeLevel::Project | ScopeLevel::Service | ScopeLevel::Env)
            }
        }
    }

    /// Validate a key against the policy regex
    pub fn validate_key(&self, key: &str) -> bool {
        Regex::new(&self.key_regex).map(|re| re.is_match(key)).unwrap_or(false)
    }

    /// Validate a value's encoded size against the policy cap
    pub fn validate_value_size(&self, value: &str) -> bool {
        value.as_bytes().len() <= (self.value_max_kb as usize) * 1024
    }

    pub fn requires_approval_for(&self, scope_level: ScopeLevel) -> bool {
        self.matches_scope(scope_level) && self.require_approval
    }

    pub fn min_approvers_for(&self, scope_level: ScopeLevel) -> u32 {
        if self.matches_scope(scope_level) {
            self.min_approvers
        } else {
            0
        }
    }

    pub fn requires_justification_for_reveal(&self, scope_level: ScopeLevel) -> bool {
        self.matches_scope(scope_level) && self.reveal_justification_required
    }
}
