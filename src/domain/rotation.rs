//! Rotation schedule records
//!
//! The core records when a secret should rotate; it never executes the
//! schedule itself. A periodic external trigger reads ACTIVE schedules and
//! invokes the rotate use case when due.

use crate::domain::id::{EnvVarId, ScheduleId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a rotation schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Active,
    Paused,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Paused => "PAUSED",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "PAUSED" => Ok(Self::Paused),
            _ => Err(format!("Unknown schedule status: {}", s)),
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recorded intent to rotate one secret on a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSchedule {
    pub id: ScheduleId,
    pub env_var_id: EnvVarId,
    /// Schedule expression (cron-style), interpreted by the external trigger
    pub schedule: String,
    pub status: ScheduleStatus,
    pub created_by: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
