//! Database connection
//!
//! The pool is owned by [DatabaseService](crate::services::database::DatabaseService);
//! everything else borrows it from there.

pub mod schema_sync;
pub mod sqlite_helpers;

use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

/// Database connection pool
pub type Database = SqlitePool;

const RETRY_INTERVAL: Duration = Duration::from_secs(2);

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Create the directory holding a file-backed database, if it is missing.
fn ensure_parent_dir(options: &SqliteConnectOptions) -> Result<()> {
    if let Some(parent) = options.get_filename().parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }
    Ok(())
}

/// Connect to SQLite, retrying every few seconds until `timeout` has elapsed.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub async fn connect_with_retry(
    url: &str,
    max_connections: u32,
    timeout: Duration,
) -> Result<Database> {
    let in_memory = is_in_memory(url);
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("Invalid database URL: {}", url))?
        .create_if_missing(true);
    if !in_memory {
        ensure_parent_dir(&options)?;
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections)
    }
    .acquire_timeout(Duration::from_secs(10));

    let deadline = Instant::now() + timeout;
    loop {
        match pool_options.clone().connect_with(options.clone()).await {
            Ok(pool) => {
                info!(in_memory, "Database connected");
                return Ok(pool);
            }
            Err(e) if Instant::now() + RETRY_INTERVAL < deadline => {
                warn!(
                    error = %e,
                    retry_in_secs = RETRY_INTERVAL.as_secs(),
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Database connection failed after {}s", timeout.as_secs())
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:users?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:./data/users.db"));
    }

    #[tokio::test]
    async fn test_connect_in_memory_keeps_data_on_one_connection() {
        let pool = connect_with_retry("sqlite::memory:", 10, Duration::from_secs(1))
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (x) VALUES (1)")
            .execute(&pool)
            .await
            .unwrap();
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn test_connect_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.db");
        let url = format!("sqlite:{}", path.display());

        let pool = connect_with_retry(&url, 2, Duration::from_secs(1))
            .await
            .unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();
        pool.close().await;

        assert!(path.exists());
    }
}
