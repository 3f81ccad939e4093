//! User service: the thin layer between the GraphQL resolvers and the user repository.
//!
//! Holds no state of its own; every call goes straight to the repository.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::services::graphql::entities::{CreateUser, User};
use crate::services::graphql::orm::{Repository, RepositoryError};

pub struct UserService {
    repository: Arc<dyn Repository<User>>,
}

impl UserService {
    pub fn new(repository: Arc<dyn Repository<User>>) -> Self {
        Self { repository }
    }

    /// All users, in store order
    pub async fn find(&self) -> Result<Vec<User>, RepositoryError> {
        let users = self.repository.find_all().await?;
        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    /// Look up one user. A missing user is `None`, not an error.
    pub async fn find_one_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let user = self.repository.find_by_id(id).await?;
        debug!(user_id = %id, found = user.is_some(), "Looked up user");
        Ok(user)
    }

    pub async fn create(&self, input: CreateUser) -> Result<User, RepositoryError> {
        let user = self.repository.save(User::from(input)).await?;
        info!(user_id = ?user.id, "Created user");
        Ok(user)
    }

    /// Delete a user. Returns `false` when no user has this id.
    ///
    /// The final answer comes from the delete itself, so of two concurrent
    /// deletes of the same id at most one reports `true`.
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        if !self.repository.exists_by_id(id).await? {
            debug!(user_id = %id, "Delete skipped, user does not exist");
            return Ok(false);
        }

        let deleted = self.repository.delete_by_id(id).await?;
        info!(user_id = %id, deleted, "Deleted user");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::connect_with_retry;
    use crate::db::schema_sync::sync_entity;
    use crate::services::graphql::orm::{InMemoryRepository, SqliteRepository};

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryRepository::<User>::new()))
    }

    fn input(name: &str, nick_name: Option<&str>) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            nick_name: nick_name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_fresh_ids() {
        let service = service();
        let a = service.create(input("Alice", Some("Al"))).await.unwrap();
        let b = service.create(input("Alice", Some("Al"))).await.unwrap();

        assert!(a.id.is_some());
        assert!(b.id.is_some());
        assert_ne!(a.id, b.id);
        assert_eq!(a.name, "Alice");
        assert_eq!(a.nick_name.as_deref(), Some("Al"));
    }

    #[tokio::test]
    async fn test_find_one_after_create() {
        let service = service();
        let created = service.create(input("Bob", None)).await.unwrap();

        let found = service
            .find_one_by_id(created.id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
        assert_eq!(service.find_one_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let service = service();
        let id = service.create(input("Carol", None)).await.unwrap().id.unwrap();

        assert!(service.delete(id).await.unwrap());
        assert!(!service.delete(id).await.unwrap());
        assert_eq!(service.find_one_by_id(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_lists_live_records_once() {
        let service = service();
        let keep = service.create(input("Dan", None)).await.unwrap();
        let gone = service.create(input("Eve", Some("E"))).await.unwrap();
        service.delete(gone.id.unwrap()).await.unwrap();

        assert_eq!(service.find().await.unwrap(), vec![keep]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_deletes_of_one_id_report_a_single_success() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("users.db").display());
        let pool = connect_with_retry(&url, 8, Duration::from_secs(5))
            .await
            .unwrap();
        sync_entity::<User>(&pool).await.unwrap();
        let service = Arc::new(UserService::new(Arc::new(SqliteRepository::<User>::new(
            pool,
        ))));

        for round in 0..20 {
            let id = service
                .create(input(&format!("User {round}"), None))
                .await
                .unwrap()
                .id
                .unwrap();

            let tasks: Vec<_> = (0..8)
                .map(|_| {
                    let service = service.clone();
                    tokio::spawn(async move { service.delete(id).await.unwrap() })
                })
                .collect();

            let mut deleted = 0;
            for task in tasks {
                if task.await.unwrap() {
                    deleted += 1;
                }
            }
            assert_eq!(deleted, 1, "round {round}");
            assert_eq!(service.find_one_by_id(id).await.unwrap(), None);
        }
        assert!(service.find().await.unwrap().is_empty());
    }
}
