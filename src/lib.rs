//! # Envkeep
//!
//! A scoped configuration and secret management core: environment variables
//! with typed values and hierarchical scopes, an append-only version history
//! with verifiable checksums, secrets encrypted at rest with time-boxed
//! reveal, a release workflow gated by approvals, and an immutable audit
//! trail covering every mutation.
//!
//! ## Architecture
//!
//! The crate is a hexagonal core. Domain entities and invariants live in
//! [`domain`]; the use cases in [`services`] orchestrate them through the
//! capability traits in [`ports`] (clock, id generation, encryption,
//! persistence, notification, export encoding). Production adapters are the
//! SQLite store in [`storage`] and the AES-256-GCM cipher in
//! [`services::secret_encryption`]; tests swap in the in-memory store and
//! fixed clocks without touching the use cases.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use envkeep::domain::{EnvVarType, ScopeRef};
//! use envkeep::ports::{SystemClock, UuidGenerator};
//! use envkeep::services::{CreateEnvVarRequest, EnvVarService, SecretEncryption};
//! use envkeep::storage::MemoryEnvStore;
//!
//! # async fn run() -> envkeep::Result<()> {
//! let service = EnvVarService::new(
//!     Arc::new(MemoryEnvStore::new()),
//!     Arc::new(SecretEncryption::for_testing()),
//!     Arc::new(SystemClock),
//!     Arc::new(UuidGenerator),
//! );
//! let request = CreateEnvVarRequest::new(
//!     "DATABASE_URL",
//!     "postgres://db.internal/app",
//!     EnvVarType::String,
//!     ScopeRef::env("staging"),
//! );
//! let var = service.create(request, "alice").await?;
//! println!("created {}", var.unique_key());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod ports;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use errors::{EnvkeepError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name used in logs and artifacts
pub const APP_NAME: &str = "envkeep";
