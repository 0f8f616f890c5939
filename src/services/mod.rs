//! Use case layer
//!
//! One service per workflow cluster, each taking its capabilities by
//! construction: env var lifecycle, secret reveal/rotation, the release
//! approval workflow, export/import, and the production cipher.

pub mod env_vars;
pub mod export;
pub mod releases;
pub mod secret_encryption;
pub mod secrets;

pub use env_vars::{
    CreateEnvVarRequest, EnvDiffReport, EnvVarService, ListEnvVarsResponse, UpdateEnvVarRequest,
};
pub use export::{ExportRequest, ExportService, FileExporter, ImportError, ImportReport};
pub use releases::{CreateReleaseRequest, ReleaseService};
pub use secret_encryption::SecretEncryption;
pub use secrets::{
    RevealedSecret, SecretService, DEFAULT_REVEAL_TTL_SECONDS, MAX_REVEAL_TTL_SECONDS,
    MIN_REVEAL_TTL_SECONDS,
};
