//! Capability ports
//!
//! Abstract boundaries the use cases depend on: time, identifiers,
//! encryption, persistence, notification, and export encoding. Each trait
//! has one production implementation and one test double; use cases receive
//! them by construction, never from a global.

pub mod cipher;
pub mod clock;
pub mod exporter;
pub mod id_generator;
pub mod notifier;
pub mod store;

pub use cipher::{KeyInfo, SecretCipher};
pub use clock::{Clock, FixedClock, SystemClock};
pub use exporter::{ExportEntry, ExportFormat, Exporter};
pub use id_generator::{IdGenerator, SequentialIds, UuidGenerator};
pub use notifier::{Notifier, NullNotifier};
pub use store::{AuditFilter, EnvStore, EnvVarFilter, Page, ReleaseFilter};
