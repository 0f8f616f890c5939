//! # Configuration Settings
//!
//! Defines the configuration structure for the envkeep core. Values come
//! from `ENVKEEP_*` environment variables with sensible defaults for local
//! development; the encryption key has no default and must be provided.

use crate::errors::{EnvkeepError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Secret encryption configuration
    #[validate(nested)]
    pub cipher: CipherConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from `ENVKEEP_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            database: DatabaseConfig::from_env(),
            cipher: CipherConfig::from_env()?,
            observability: ObservabilityConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(EnvkeepError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite://") {
            return Err(EnvkeepError::validation("Database URL must start with 'sqlite://'"));
        }
        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum pool connections
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub connect_timeout_seconds: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("ENVKEEP_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://envkeep.db".to_string()),
            max_connections: env_parse("ENVKEEP_DATABASE_MAX_CONNECTIONS", 10),
            connect_timeout_seconds: env_parse("ENVKEEP_DATABASE_CONNECT_TIMEOUT", 30),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://envkeep.db".to_string(),
            max_connections: 10,
            connect_timeout_seconds: 30,
        }
    }
}

/// Secret encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct CipherConfig {
    /// Base64-encoded 32-byte master key
    #[validate(length(min = 1, message = "Master key cannot be empty"))]
    #[serde(skip_serializing, default)]
    pub master_key_base64: String,

    /// Label for the active key, carried into audit-facing key info
    pub key_version: String,
}

impl CipherConfig {
    pub fn from_env() -> Result<Self> {
        let master_key_base64 = std::env::var("ENVKEEP_SECRET_ENCRYPTION_KEY").map_err(|_| {
            EnvkeepError::config(
                "ENVKEEP_SECRET_ENCRYPTION_KEY is required (base64-encoded 32-byte key)",
            )
        })?;
        Ok(Self {
            master_key_base64,
            key_version: std::env::var("ENVKEEP_SECRET_KEY_VERSION")
                .unwrap_or_else(|_| "v1".to_string()),
        })
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level filter (tracing `EnvFilter` syntax)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable lines
    pub json_logs: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        Self {
            log_level: std::env::var("ENVKEEP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: env_parse("ENVKEEP_LOG_JSON", false),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let mut config = AppConfig::default();
        config.cipher.master_key_base64 = "a".repeat(44);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_sqlite_url_rejected() {
        let mut config = AppConfig::default();
        config.cipher.master_key_base64 = "a".repeat(44);
        config.database.url = "postgresql://localhost/envkeep".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_master_key_rejected() {
        let config = AppConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn master_key_not_serialized() {
        let mut config = CipherConfig::default();
        config.master_key_base64 = "super-secret".to_string();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
