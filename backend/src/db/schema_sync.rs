//! Automatic schema synchronization from entity definitions
//!
//! - Creates missing tables from [DatabaseSchema::create_table_sql]
//! - Adds missing columns to existing tables
//! - Does NOT handle column renames or type changes (requires DB wipe)
//!
//! A `users` table created before `nick_name` existed is upgraded in place.

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::services::graphql::entities::User;
use crate::services::graphql::orm::{ColumnDef, DatabaseEntity, DatabaseSchema};

/// Result of a schema sync operation
#[derive(Debug, Default)]
pub struct SchemaSyncResult {
    pub tables_created: Vec<String>,
    pub columns_added: Vec<(String, String)>, // (table, column)
    pub errors: Vec<String>,
}

impl SchemaSyncResult {
    fn merge(&mut self, other: SchemaSyncResult) {
        self.tables_created.extend(other.tables_created);
        self.columns_added.extend(other.columns_added);
        self.errors.extend(other.errors);
    }
}

/// Check if a table exists in the database
async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool, sqlx::Error> {
    let result: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?;

    Ok(result.is_some())
}

/// Get existing columns for a table
async fn get_table_columns(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
        sqlx::query_as(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(_, name, _, _, _, _)| name).collect())
}

/// Sync a single entity's table to the database
pub async fn sync_entity<E: DatabaseSchema>(
    pool: &SqlitePool,
) -> Result<SchemaSyncResult, sqlx::Error> {
    let mut result = SchemaSyncResult::default();
    let table_name = E::TABLE_NAME;

    if !table_exists(pool, table_name).await? {
        let create_sql = E::create_table_sql();
        debug!("Creating table {}: {}", table_name, create_sql);

        match sqlx::query(&create_sql).execute(pool).await {
            Ok(_) => {
                info!("Created table: {}", table_name);
                result.tables_created.push(table_name.to_string());
            }
            Err(e) => {
                let msg = format!("Failed to create table {}: {}", table_name, e);
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
        return Ok(result);
    }

    let existing_columns = get_table_columns(pool, table_name).await?;
    for col_def in E::columns() {
        if existing_columns.iter().any(|c| c == col_def.name) {
            continue;
        }

        let Some(alter_sql) = generate_add_column_sql(table_name, col_def) else {
            let msg = format!(
                "Cannot add primary key column {}.{} to an existing table",
                table_name, col_def.name
            );
            warn!("{}", msg);
            result.errors.push(msg);
            continue;
        };
        debug!("Adding column to {}: {}", table_name, alter_sql);

        match sqlx::query(&alter_sql).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{}", table_name, col_def.name);
                result
                    .columns_added
                    .push((table_name.to_string(), col_def.name.to_string()));
            }
            Err(e) => {
                let msg = format!(
                    "Failed to add column {}.{}: {}",
                    table_name, col_def.name, e
                );
                warn!("{}", msg);
                result.errors.push(msg);
            }
        }
    }

    Ok(result)
}

/// Generate ALTER TABLE ADD COLUMN SQL. `None` for primary key columns,
/// which SQLite cannot add after the fact.
fn generate_add_column_sql(table_name: &str, col: &ColumnDef) -> Option<String> {
    if col.is_primary_key {
        return None;
    }

    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table_name, col.name, col.sql_type
    );

    // SQLite cannot add NOT NULL columns without a default
    if let Some(default) = col.default {
        if !col.nullable {
            sql.push_str(" NOT NULL");
        }
        sql.push_str(&format!(" DEFAULT {}", default));
    } else if !col.nullable {
        let default_val = match col.sql_type {
            "INTEGER" => "0",
            "REAL" => "0.0",
            _ => "''",
        };
        sql.push_str(&format!(" NOT NULL DEFAULT {}", default_val));
    }

    Some(sql)
}

/// Sync every entity table. Errors are collected rather than returned so a
/// single bad table does not block startup.
pub async fn sync_all_entity_schemas(pool: &SqlitePool) -> SchemaSyncResult {
    let mut result = SchemaSyncResult::default();
    match sync_entity::<User>(pool).await {
        Ok(r) => result.merge(r),
        Err(e) => result
            .errors
            .push(format!("Failed to sync {}: {}", User::TABLE_NAME, e)),
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_creates_missing_table_once() {
        let pool = pool().await;

        let first = sync_all_entity_schemas(&pool).await;
        assert_eq!(first.tables_created, vec!["users".to_string()]);
        assert!(first.errors.is_empty());

        let second = sync_all_entity_schemas(&pool).await;
        assert!(second.tables_created.is_empty());
        assert!(second.columns_added.is_empty());
        assert!(second.errors.is_empty());

        assert_eq!(
            get_table_columns(&pool, "users").await.unwrap(),
            vec!["id", "name", "nick_name"]
        );
    }

    #[tokio::test]
    async fn test_adds_nick_name_to_name_only_table() {
        let pool = pool().await;
        sqlx::query("CREATE TABLE users (id TEXT PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (id, name) VALUES (?, 'Alice')")
            .bind("6f1c2d9e-8a4b-4c3d-9e2f-1a2b3c4d5e6f")
            .execute(&pool)
            .await
            .unwrap();

        let result = sync_all_entity_schemas(&pool).await;
        assert_eq!(
            result.columns_added,
            vec![("users".to_string(), "nick_name".to_string())]
        );

        let (nick,): (Option<String>,) = sqlx::query_as("SELECT nick_name FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(nick, None);
    }

    #[tokio::test]
    async fn test_sync_on_closed_pool_reports_table_error() {
        let pool = pool().await;
        pool.close().await;

        let result = sync_all_entity_schemas(&pool).await;
        assert!(result.tables_created.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(
            result.errors[0].starts_with("Failed to sync users: "),
            "{:?}",
            result.errors
        );
    }

    #[test]
    fn test_add_column_sql() {
        let cols = User::columns();
        assert_eq!(generate_add_column_sql("users", &cols[0]), None);
        assert_eq!(
            generate_add_column_sql("users", &cols[1]).unwrap(),
            "ALTER TABLE users ADD COLUMN name TEXT NOT NULL DEFAULT ''"
        );
        assert_eq!(
            generate_add_column_sql("users", &cols[2]).unwrap(),
            "ALTER TABLE users ADD COLUMN nick_name TEXT"
        );
    }
}
