//! GraphQL schema definition with queries and mutations
//!
//! The operation set is small enough to spell out: [OPERATIONS] lists every
//! root field with its argument and return shape, and the tests check the
//! generated SDL against it.

use std::sync::Arc;

use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::services::users::UserService;

use super::entities::{UserMutations, UserQueries};

/// The GraphQL schema type
pub type UserSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(UserQueries);

#[derive(MergedObject, Default)]
pub struct MutationRoot(UserMutations);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// One root field of the schema.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub kind: OperationKind,
    /// Argument list as written in SDL, empty when the field takes none
    pub arguments: &'static str,
    pub returns: &'static str,
}

impl Operation {
    /// The field as it appears in SDL, e.g. `user(id: UUID!): User`
    pub fn signature(&self) -> String {
        if self.arguments.is_empty() {
            format!("{}: {}", self.name, self.returns)
        } else {
            format!("{}({}): {}", self.name, self.arguments, self.returns)
        }
    }
}

pub const OPERATIONS: &[Operation] = &[
    Operation {
        name: "users",
        kind: OperationKind::Query,
        arguments: "",
        returns: "[User!]!",
    },
    Operation {
        name: "user",
        kind: OperationKind::Query,
        arguments: "id: UUID!",
        returns: "User",
    },
    Operation {
        name: "createUser",
        kind: OperationKind::Mutation,
        arguments: "input: CreateUser!",
        returns: "User!",
    },
    Operation {
        name: "deleteUser",
        kind: OperationKind::Mutation,
        arguments: "id: UUID!",
        returns: "UUID",
    },
];

/// Build the GraphQL schema with all resolvers
pub fn build_schema(users: Arc<UserService>) -> UserSchema {
    for op in OPERATIONS {
        tracing::debug!(kind = ?op.kind, operation = %op.signature(), "Registering operation");
    }

    Schema::build(
        QueryRoot::default(),
        MutationRoot::default(),
        EmptySubscription,
    )
    .data(users)
    .finish()
}

#[cfg(test)]
mod tests {
    use async_graphql::{Request, Variables};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::db::schema_sync::sync_entity;
    use crate::services::graphql::entities::User;
    use crate::services::graphql::orm::{InMemoryRepository, SqliteRepository};

    fn schema() -> UserSchema {
        let repo = Arc::new(InMemoryRepository::<User>::new());
        build_schema(Arc::new(UserService::new(repo)))
    }

    async fn sqlite_schema() -> UserSchema {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sync_entity::<User>(&pool).await.unwrap();
        let repo = Arc::new(SqliteRepository::<User>::new(pool));
        build_schema(Arc::new(UserService::new(repo)))
    }

    async fn run(schema: &UserSchema, query: &str, variables: Value) -> Value {
        let response = schema
            .execute(Request::new(query).variables(Variables::from_json(variables)))
            .await;
        assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
        response.data.into_json().unwrap()
    }

    const CREATE: &str = r#"
        mutation Create($input: CreateUser!) {
            createUser(input: $input) { id name nickName }
        }
    "#;
    const GET: &str = "query Get($id: UUID!) { user(id: $id) { id name nickName } }";
    const LIST: &str = "{ users { id name nickName } }";
    const DELETE: &str = "mutation Delete($id: UUID!) { deleteUser(id: $id) }";

    #[test]
    fn test_sdl_matches_operation_table() {
        let sdl = schema().sdl();
        for op in OPERATIONS {
            assert!(
                sdl.contains(&op.signature()),
                "missing {} in SDL:\n{}",
                op.signature(),
                sdl
            );
        }
        assert!(sdl.contains("nickName: String"));
        assert!(sdl.contains("id: UUID!"));
    }

    async fn assert_create_list_delete_scenario(schema: UserSchema) {
        let created = run(
            &schema,
            CREATE,
            json!({ "input": { "name": "Alice", "nickName": "Al" } }),
        )
        .await;
        let user = &created["createUser"];
        let id = user["id"].as_str().unwrap().to_string();
        assert_eq!(user["name"], "Alice");
        assert_eq!(user["nickName"], "Al");

        let listed = run(&schema, LIST, json!({})).await;
        assert_eq!(listed["users"], json!([{ "id": id, "name": "Alice", "nickName": "Al" }]));

        let fetched = run(&schema, GET, json!({ "id": id })).await;
        assert_eq!(fetched["user"], user.clone());

        let deleted = run(&schema, DELETE, json!({ "id": id })).await;
        assert_eq!(deleted["deleteUser"], json!(id));

        let fetched = run(&schema, GET, json!({ "id": id })).await;
        assert_eq!(fetched["user"], Value::Null);

        let deleted = run(&schema, DELETE, json!({ "id": id })).await;
        assert_eq!(deleted["deleteUser"], Value::Null);

        let listed = run(&schema, LIST, json!({})).await;
        assert_eq!(listed["users"], json!([]));
    }

    #[tokio::test]
    async fn test_create_list_delete_scenario() {
        assert_create_list_delete_scenario(schema()).await;
    }

    #[tokio::test]
    async fn test_create_list_delete_scenario_on_sqlite() {
        assert_create_list_delete_scenario(sqlite_schema().await).await;
    }

    #[tokio::test]
    async fn test_nick_name_is_optional() {
        let schema = schema();
        let created = run(&schema, CREATE, json!({ "input": { "name": "Bob" } })).await;
        assert_eq!(created["createUser"]["nickName"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_id_is_null() {
        let schema = schema();
        let id = uuid::Uuid::new_v4().to_string();

        let fetched = run(&schema, GET, json!({ "id": id })).await;
        assert_eq!(fetched["user"], Value::Null);

        let deleted = run(&schema, DELETE, json!({ "id": id })).await;
        assert_eq!(deleted["deleteUser"], Value::Null);
    }

    #[tokio::test]
    async fn test_users_counts_every_live_record() {
        let schema = schema();
        for name in ["A", "B", "C"] {
            run(&schema, CREATE, json!({ "input": { "name": name } })).await;
        }

        let listed = run(&schema, LIST, json!({})).await;
        let users = listed["users"].as_array().unwrap();
        assert_eq!(users.len(), 3);

        let mut ids: Vec<&str> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let schema = schema();
        let response = schema
            .execute(
                Request::new(CREATE)
                    .variables(Variables::from_json(json!({ "input": { "name": "" } }))),
            )
            .await;
        assert!(!response.errors.is_empty());

        let listed = run(&schema, LIST, json!({})).await;
        assert_eq!(listed["users"], json!([]));
    }

    #[tokio::test]
    async fn test_missing_name_and_bad_id_are_rejected() {
        let schema = schema();

        let response = schema
            .execute(
                Request::new(CREATE)
                    .variables(Variables::from_json(json!({ "input": { "nickName": "x" } }))),
            )
            .await;
        assert!(!response.errors.is_empty());

        let response = schema
            .execute(
                Request::new(GET).variables(Variables::from_json(json!({ "id": "not-a-uuid" }))),
            )
            .await;
        assert!(!response.errors.is_empty());
    }
}
