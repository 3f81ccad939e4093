//! Repository pattern for entity data access
//!
//! [Repository] is the one seam between the service layer and storage.
//! Two backends implement it:
//!
//! - [SqliteRepository]: parameterized sqlx queries generated from the
//!   entity's [DatabaseEntity] metadata.
//! - [InMemoryRepository]: an insertion-ordered vector behind a lock, used by
//!   tests and by `STORAGE_BACKEND=memory`.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! let repo: Arc<dyn Repository<User>> = Arc::new(SqliteRepository::<User>::new(pool));
//!
//! let saved = repo.save(User::from(input)).await?;
//! let found = repo.find_by_id(saved.id.unwrap()).await?;
//! let removed = repo.delete_by_id(saved.id.unwrap()).await?;
//! ```

use std::marker::PhantomData;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::Database;
use crate::db::sqlite_helpers::uuid_to_str;
use crate::services::graphql::orm::{DatabaseEntity, Entity, FromSqlRow, ToSqlValues};

/// Errors raised by a repository backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{table} row {id} was not readable after save")]
    Missing { table: &'static str, id: Uuid },
}

/// Generic find/save/delete over an entity.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All records, in store order
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// Insert the record (assigning a fresh id when unset) or replace the row
    /// with the same id. Returns the persisted record.
    async fn save(&self, entity: E) -> Result<E, RepositoryError>;

    /// Remove the record. Returns whether a record was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

// ============================================================================
// SQLite
// ============================================================================

/// Repository backed by a single SQLite table.
pub struct SqliteRepository<E> {
    pool: Database,
    _marker: PhantomData<fn() -> E>,
}

impl<E> SqliteRepository<E> {
    pub fn new(pool: Database) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }
}

impl<E: DatabaseEntity> SqliteRepository<E> {
    fn by_id_sql() -> String {
        format!("{} WHERE {} = ?", E::select_sql(), E::PRIMARY_KEY)
    }

    /// `INSERT ... ON CONFLICT(pk) DO UPDATE` over every column
    fn upsert_sql() -> String {
        let columns = E::column_names();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != E::PRIMARY_KEY)
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();

        let conflict = if updates.is_empty() {
            "DO NOTHING".to_string()
        } else {
            format!("DO UPDATE SET {}", updates.join(", "))
        };

        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
            E::TABLE_NAME,
            columns.join(", "),
            placeholders,
            E::PRIMARY_KEY,
            conflict
        )
    }
}

#[async_trait]
impl<E> Repository<E> for SqliteRepository<E>
where
    E: Entity + DatabaseEntity + FromSqlRow + ToSqlValues,
{
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY {} {}",
            E::select_sql(),
            E::DEFAULT_SORT,
            E::DEFAULT_SORT_DIR
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let entities = rows
            .iter()
            .map(E::from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        let sql = Self::by_id_sql();
        let row = sqlx::query(&sql)
            .bind(uuid_to_str(id))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(E::from_row).transpose()?)
    }

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?)",
            E::TABLE_NAME,
            E::PRIMARY_KEY
        );
        let (exists,): (i64,) = sqlx::query_as(&sql)
            .bind(uuid_to_str(id))
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    async fn save(&self, entity: E) -> Result<E, RepositoryError> {
        let id = entity.id().unwrap_or_else(Uuid::new_v4);
        let entity = entity.with_id(id);

        let sql = Self::upsert_sql();
        let values = entity.to_sql_values();
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = value.bind_to_query(query);
        }
        query.execute(&self.pool).await?;

        self.find_by_id(id).await?.ok_or(RepositoryError::Missing {
            table: E::TABLE_NAME,
            id,
        })
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", E::TABLE_NAME, E::PRIMARY_KEY);
        let result = sqlx::query(&sql)
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Repository holding records in process memory, in insertion order.
pub struct InMemoryRepository<E> {
    records: RwLock<Vec<E>>,
}

impl<E> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<E> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    async fn find_all(&self) -> Result<Vec<E>, RepositoryError> {
        Ok(self.records.read().clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|e| e.id() == Some(id))
            .cloned())
    }

    async fn exists_by_id(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.records.read().iter().any(|e| e.id() == Some(id)))
    }

    async fn save(&self, entity: E) -> Result<E, RepositoryError> {
        let id = entity.id().unwrap_or_else(Uuid::new_v4);
        let entity = entity.with_id(id);

        let mut records = self.records.write();
        match records.iter_mut().find(|e| e.id() == Some(id)) {
            Some(existing) => *existing = entity.clone(),
            None => records.push(entity.clone()),
        }
        Ok(entity)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|e| e.id() != Some(id));
        Ok(records.len() < before)
    }
}
