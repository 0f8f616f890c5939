//! # Database Connection Pool Management
//!
//! Provides SQLite connection pool creation and schema bootstrapping.

use crate::config::DatabaseConfig;
use crate::errors::{EnvkeepError, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    Pool, Sqlite,
};
use std::{str::FromStr, time::Duration};

/// Type alias for the database connection pool
pub type DbPool = Pool<Sqlite>;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a database connection pool with the specified configuration and
/// apply the schema.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool<Sqlite>> {
    validate_config(config)?;

    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| EnvkeepError::Database {
            source: e,
            context: format!("Invalid SQLite connection string: {}", config.url),
        })?
        .create_if_missing(true)
        .busy_timeout(SQLITE_BUSY_TIMEOUT)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                url = %config.url,
                busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
                "Failed to create SQLite database pool"
            );
            EnvkeepError::Database {
                source: e,
                context: format!("Failed to connect to database: {}", config.url),
            }
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        connect_timeout_s = config.connect_timeout_seconds,
        "Database connection pool created"
    );

    crate::storage::schema::apply_schema(&pool).await?;
    Ok(pool)
}

/// In-memory pool for tests
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let config = DatabaseConfig {
        url: "sqlite://:memory:".to_string(),
        max_connections: 1,
        connect_timeout_seconds: 5,
    };
    create_pool(&config).await
}

fn validate_config(config: &DatabaseConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(EnvkeepError::validation("max_connections must be greater than 0"));
    }
    if config.url.is_empty() {
        return Err(EnvkeepError::validation("database URL cannot be empty"));
    }
    if !config.url.starts_with("sqlite://") {
        return Err(EnvkeepError::validation("database URL must start with 'sqlite://'"));
    }
    Ok(())
}
