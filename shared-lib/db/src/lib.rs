//! Database utilities and connection pooling for the drinks services.
//!
//! This crate provides SQLite connection pool management using sqlx.

mod config;
mod pool;

pub use config::DbConfig;
pub use pool::{create_pool, health_check, map_sqlx_error, DbPool};

// Re-export sqlx types for convenience
pub use sqlx::{self, Row};
