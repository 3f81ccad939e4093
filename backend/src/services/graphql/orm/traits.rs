//! Core traits for the ORM layer
//!
//! Entities implement these by hand next to their GraphQL type definition
//! (see [User](crate::services::graphql::entities::User)). The repositories
//! and schema sync only ever talk to entities through these traits.

use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use uuid::Uuid;

/// Column definition for schema generation.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name in the database
    pub name: &'static str,
    /// SQLite column type (TEXT, INTEGER, REAL, BLOB)
    pub sql_type: &'static str,
    /// Whether the column can be NULL
    pub nullable: bool,
    /// Whether this is the primary key
    pub is_primary_key: bool,
    /// Default value expression (e.g., "datetime('now')")
    pub default: Option<&'static str>,
}

impl ColumnDef {
    /// Generate the column definition SQL
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);

        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }

        if !self.nullable && !self.is_primary_key {
            sql.push_str(" NOT NULL");
        }

        if let Some(default) = self.default {
            sql.push_str(&format!(" DEFAULT {}", default));
        }

        sql
    }
}

/// Metadata about a database entity (table).
pub trait DatabaseEntity: Sized + Send + Sync {
    /// The SQL table name (e.g., "users")
    const TABLE_NAME: &'static str;

    /// The primary key column name (e.g., "id")
    const PRIMARY_KEY: &'static str;

    /// Default sort column for list queries (e.g., "name")
    const DEFAULT_SORT: &'static str;

    /// Default sort direction
    const DEFAULT_SORT_DIR: &'static str = "ASC";

    /// List of all column names in the table, primary key first
    fn column_names() -> &'static [&'static str];

    /// Build a SELECT query for all columns
    fn select_sql() -> String {
        let columns = Self::column_names().join(", ");
        format!("SELECT {} FROM {}", columns, Self::TABLE_NAME)
    }
}

/// Trait for database schema generation and migration.
pub trait DatabaseSchema: DatabaseEntity {
    /// Get all column definitions for this entity's table
    fn columns() -> &'static [ColumnDef];

    /// Generate CREATE TABLE IF NOT EXISTS SQL
    fn create_table_sql() -> String {
        let column_defs: Vec<String> = Self::columns().iter().map(|c| c.to_sql()).collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
            Self::TABLE_NAME,
            column_defs.join(",\n  ")
        )
    }
}

/// Trait for decoding a database row into an entity.
pub trait FromSqlRow: Sized {
    /// Decode a SQLite row into this entity type
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error>;
}

/// Trait for encoding an entity into bind values.
///
/// Values must line up with [DatabaseEntity::column_names].
pub trait ToSqlValues {
    fn to_sql_values(&self) -> Vec<SqlValue>;
}

/// A persisted record with a store-assigned identifier.
///
/// `id` is `None` until the record has been saved for the first time.
pub trait Entity: Clone + Send + Sync + 'static {
    fn id(&self) -> Option<Uuid>;

    /// Return the record with its identifier set.
    fn with_id(self, id: Uuid) -> Self;
}

/// Represents a SQL value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Null,
}

impl SqlValue {
    /// Bind this value to a sqlx query builder
    pub fn bind_to_query<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match self {
            SqlValue::String(s) => query.bind(s.as_str()),
            SqlValue::Null => query.bind(None::<String>),
        }
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::String).unwrap_or(SqlValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_def_to_sql() {
        let pk = ColumnDef {
            name: "id",
            sql_type: "TEXT",
            nullable: false,
            is_primary_key: true,
            default: None,
        };
        assert_eq!(pk.to_sql(), "id TEXT PRIMARY KEY");

        let required = ColumnDef {
            name: "name",
            sql_type: "TEXT",
            nullable: false,
            is_primary_key: false,
            default: None,
        };
        assert_eq!(required.to_sql(), "name TEXT NOT NULL");

        let defaulted = ColumnDef {
            default: Some("''"),
            ..required
        };
        assert_eq!(defaulted.to_sql(), "name TEXT NOT NULL DEFAULT ''");
    }

    #[test]
    fn test_optional_string_to_sql_value() {
        assert_eq!(SqlValue::from(None), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("Al".to_string())),
            SqlValue::String("Al".to_string())
        );
    }
}
