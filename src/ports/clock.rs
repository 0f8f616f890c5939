//! Clock capability
//!
//! The core never reads wall time itself; it asks this port. Use cases take
//! an injected clock so tests can pin time.

use chrono::{DateTime, Utc};

/// Time source for the core
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current instant, explicitly UTC
    fn utcnow(&self) -> DateTime<Utc> {
        self.now()
    }

    /// Seconds since the Unix epoch
    fn timestamp(&self) -> f64 {
        let now = self.now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
    }
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock pinned to a fixed instant
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// A deterministic instant for tests
    pub fn at_epoch_day(days: i64) -> Self {
        Self { instant: DateTime::from_timestamp(days * 86_400, 0).expect("valid timestamp") }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::at_epoch_day(1);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.timestamp(), 86_400.0);
    }
}
