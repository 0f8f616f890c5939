//! Configuration loading and validation

pub mod settings;

pub use settings::{AppConfig, CipherConfig, DatabaseConfig, ObservabilityConfig};
