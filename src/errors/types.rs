//! # Error Types
//!
//! Comprehensive error types for the envkeep core using `thiserror`.
//!
//! Use cases validate eagerly and fail fast before any persistence. Once the
//! primary entity write has happened, a failure on the paired version/audit
//! write surfaces here as well: there is no "updated-but-unaudited" success
//! state. Secret values never appear in error messages.

/// Custom result type for envkeep operations
pub type Result<T> = std::result::Result<T, EnvkeepError>;

/// Main error type for the envkeep core
#[derive(thiserror::Error, Debug)]
pub enum EnvkeepError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Domain validation errors (malformed key/value/type), never persisted
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Duplicate scoped key
    #[error("Resource conflict: {message}")]
    AlreadyExists { message: String, resource_type: String },

    /// Missing EnvVar/Release/Approval
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Secret-only operation attempted on a non-secret variable
    #[error("Environment variable '{key}' is not a secret")]
    NotSecret { key: String },

    /// Mutation attempted against a protected scope (prod/production)
    #[error("Operation refused for restricted environment scope '{scope}'")]
    RestrictedEnvironment { scope: String },

    /// Illegal Release/Approval state change
    #[error("Invalid transition for {resource_type} '{id}': {message}")]
    InvalidTransition { resource_type: String, id: String, message: String },

    /// Encrypt/decrypt failure reported by the cipher capability
    #[error("Cipher error: {message}")]
    Cipher { message: String },

    /// Batched release application stopped partway
    #[error("Release '{release_id}' apply failed at change {failed_index}: {message}")]
    ReleaseApply {
        release_id: String,
        /// Indices of changes that were fully applied before the failure
        applied: Vec<usize>,
        failed_index: usize,
        message: String,
    },

    /// Store capability failures, fatal to the current operation
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Internal invariant violations
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EnvkeepError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error naming the violated field
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a conflict error for a duplicate scoped key
    pub fn already_exists<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::AlreadyExists { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a not-secret error
    pub fn not_secret<K: Into<String>>(key: K) -> Self {
        Self::NotSecret { key: key.into() }
    }

    /// Create a restricted-environment error
    pub fn restricted_environment<S: Into<String>>(scope: S) -> Self {
        Self::RestrictedEnvironment { scope: scope.into() }
    }

    /// Create an invalid-transition error
    pub fn invalid_transition<R, I, M>(resource_type: R, id: I, message: M) -> Self
    where
        R: Into<String>,
        I: Into<String>,
        M: Into<String>,
    {
        Self::InvalidTransition {
            resource_type: resource_type.into(),
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a cipher error
    pub fn cipher<S: Into<String>>(message: S) -> Self {
        Self::Cipher { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether the current operation may be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, EnvkeepError::Database { .. } | EnvkeepError::Io { .. })
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for EnvkeepError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for EnvkeepError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<std::io::Error> for EnvkeepError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for EnvkeepError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
