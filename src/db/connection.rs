//! Database connection management using sqlx

use crate::config::DatabaseConfig;
use crate::error::{InsightsError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub type DbPool = PgPool;

/// Initialize the database connection pool
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect_options.clone())
        .await
        .map_err(|e| InsightsError::Database(format!("Failed to connect to database: {}", e)))?;

    // Test the connection
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| InsightsError::Database(format!("Connection check failed: {}", e)))?;

    info!(
        "Connected to database {} on {}:{}",
        config.connect_options.get_database().unwrap_or("(default)"),
        config.connect_options.get_host(),
        config.connect_options.get_port()
    );
    Ok(pool)
}
