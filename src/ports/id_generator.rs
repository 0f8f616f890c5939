//! Identifier generation capability
//!
//! Unique identifiers are injected, never invented inside use cases, so
//! tests can produce deterministic IDs.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of unique identifiers
pub trait IdGenerator: Send + Sync {
    /// Generate a new unique ID string
    fn generate(&self) -> String;

    /// Generate a UUID
    fn generate_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }

    /// Generate a short ID (12 hex characters)
    fn generate_short_id(&self) -> String {
        let uuid = self.generate_uuid();
        uuid.simple().to_string()[..12].to_string()
    }
}

/// Production generator backed by random v4 UUIDs
#[derive(Debug, Clone, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic generator for tests: id-1, id-2, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("id-{}", n)
    }
}
