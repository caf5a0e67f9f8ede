//! Database connection pool management.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::config::DbConfig;
use error::DatabaseError;

/// Type alias for the SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new database connection pool.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, DatabaseError> {
    tracing::info!("Creating database pool: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| {
            tracing::error!("Invalid database URL {}: {}", config.url, e);
            DatabaseError::ConnectionFailed(e.to_string())
        })?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if config.is_in_memory() {
        // Dropping the last connection discards an in-memory database.
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        tracing::error!("Failed to create database pool: {}", e);
        DatabaseError::ConnectionFailed(e.to_string())
    })?;

    tracing::info!("Database pool created successfully");
    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn health_check(pool: &DbPool) -> Result<(), DatabaseError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
    Ok(())
}

/// Map a sqlx error onto the shared database error type.
pub fn map_sqlx_error(err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::DuplicateEntry(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DatabaseError::ConnectionFailed(err.to_string())
        }
        other => DatabaseError::QueryFailed(other.to_string()),
    }
}
