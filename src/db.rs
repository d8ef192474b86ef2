use anyhow::{Context, Result};
use sqlx::{postgres::{PgConnectOptions, PgPoolOptions}, PgPool};
use tracing::info;
use std::str::FromStr;

use crate::config::DatabaseConfig;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL database");

        let connect_options = PgConnectOptions::from_str(&config.url)
            .context("Failed to parse DATABASE_URL")?
            // Supabase pooler (pgBouncer, transaction mode) rejects cached statements
            .statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .idle_timeout(std::time::Duration::from_secs(300))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .connect_with(connect_options)
            .await
            .context("Failed to connect to PostgreSQL database. Check that DATABASE_URL is set correctly and the database is reachable.")?;

        info!("Database connection established successfully");
        Ok(Database { pool })
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .persistent(false)
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;

        info!("Database health check passed");
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}
