//! Database service: wraps the SQLite pool for lifecycle (start/stop/health) and dependencies.
//!
//! Services that need the database should declare `dependencies: ["database"]`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::query;
use tracing::{info, warn};

use crate::db::schema_sync::sync_all_entity_schemas;
use crate::db::{Database, connect_with_retry};
use crate::services::manager::{Service, ServiceHealth};

/// Configuration for the database service (connection URL, pool size, timeouts).
#[derive(Debug, Clone)]
pub struct DatabaseServiceConfig {
    /// SQLite connection URL (e.g. `sqlite:./data/users.db` or `sqlite::memory:`).
    pub database_url: String,
    pub max_connections: u32,
    /// How long to retry connecting before giving up.
    pub connect_timeout: Duration,
}

impl Default for DatabaseServiceConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/users.db".to_string(),
            max_connections: 10,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Service that owns the database pool and provides start/stop/health.
/// Register this first so that services depending on `"database"` can start after it.
pub struct DatabaseService {
    pool: Database,
}

impl DatabaseService {
    /// Create a new database service with an already-connected pool.
    pub fn new(pool: Database) -> Self {
        Self { pool }
    }

    /// Create and connect the database service from config.
    pub async fn from_config(config: DatabaseServiceConfig) -> Result<Self> {
        let pool = connect_with_retry(
            &config.database_url,
            config.max_connections,
            config.connect_timeout,
        )
        .await
        .context("Database service: connect_with_retry failed")?;
        Ok(Self::new(pool))
    }

    /// Access the pool. Valid until [Service::stop] is called.
    pub fn pool(&self) -> &Database {
        &self.pool
    }
}

#[async_trait]
impl Service for DatabaseService {
    fn name(&self) -> &str {
        "database"
    }

    async fn start(&self) -> Result<()> {
        info!(service = "database", "Database service starting");
        query("SELECT 1").execute(self.pool()).await?;

        info!(service = "database", "Syncing entity schemas");
        let sync_result = sync_all_entity_schemas(self.pool()).await;
        if !sync_result.tables_created.is_empty() {
            info!(
                service = "database",
                tables = ?sync_result.tables_created,
                "Created tables"
            );
        }
        if !sync_result.columns_added.is_empty() {
            info!(
                service = "database",
                columns = ?sync_result.columns_added,
                "Added columns"
            );
        }
        for err in &sync_result.errors {
            warn!(service = "database", error = %err, "Schema sync error");
        }
        info!(service = "database", "Database service started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.pool.close().await;
        info!(service = "database", "Database service stopped");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        match query("SELECT 1").execute(self.pool()).await {
            Ok(_) => Ok(ServiceHealth::healthy()),
            Err(e) => {
                warn!(service = "database", error = %e, "Health check failed");
                Ok(ServiceHealth::unhealthy(e.to_string()))
            }
        }
    }
}
