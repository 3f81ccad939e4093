use std::sync::Arc;

use async_graphql::{ComplexObject, Context, InputObject, Object, Result, SimpleObject};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::db::sqlite_helpers::{decode_uuid, uuid_to_str};
use crate::services::graphql::orm::{
    ColumnDef, DatabaseEntity, DatabaseSchema, Entity, FromSqlRow, RepositoryError, SqlValue,
    ToSqlValues,
};
use crate::services::users::UserService;

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
#[graphql(name = "User", complex)]
pub struct User {
    /// Exposed through [User::graphql_id] once the record has been saved
    #[graphql(skip)]
    pub id: Option<Uuid>,

    pub name: String,

    pub nick_name: Option<String>,
}

#[ComplexObject]
impl User {
    #[graphql(name = "id")]
    async fn graphql_id(&self) -> Result<Uuid> {
        self.id
            .ok_or_else(|| async_graphql::Error::new("User has not been saved"))
    }
}

/// Payload for `createUser`.
#[derive(InputObject, Clone, Debug)]
#[graphql(name = "CreateUser")]
pub struct CreateUser {
    #[graphql(validator(min_length = 1))]
    pub name: String,

    pub nick_name: Option<String>,
}

impl From<CreateUser> for User {
    fn from(input: CreateUser) -> Self {
        Self {
            id: None,
            name: input.name,
            nick_name: input.nick_name,
        }
    }
}

// ============================================================================
// Table mapping
// ============================================================================

const USER_COLUMNS: &[ColumnDef] = &[
    ColumnDef {
        name: "id",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: true,
        default: None,
    },
    ColumnDef {
        name: "name",
        sql_type: "TEXT",
        nullable: false,
        is_primary_key: false,
        default: None,
    },
    ColumnDef {
        name: "nick_name",
        sql_type: "TEXT",
        nullable: true,
        is_primary_key: false,
        default: None,
    },
];

impl DatabaseEntity for User {
    const TABLE_NAME: &'static str = "users";
    const PRIMARY_KEY: &'static str = "id";
    const DEFAULT_SORT: &'static str = "name";

    fn column_names() -> &'static [&'static str] {
        &["id", "name", "nick_name"]
    }
}

impl DatabaseSchema for User {
    fn columns() -> &'static [ColumnDef] {
        USER_COLUMNS
    }
}

impl FromSqlRow for User {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: Some(decode_uuid(row, "id")?),
            name: row.try_get("name")?,
            nick_name: row.try_get("nick_name")?,
        })
    }
}

impl ToSqlValues for User {
    fn to_sql_values(&self) -> Vec<SqlValue> {
        vec![
            self.id
                .map(|id| SqlValue::String(uuid_to_str(id)))
                .unwrap_or(SqlValue::Null),
            SqlValue::String(self.name.clone()),
            SqlValue::from(self.nick_name.clone()),
        ]
    }
}

impl Entity for User {
    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn with_id(self, id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

fn user_service<'ctx>(ctx: &Context<'ctx>) -> Result<&'ctx Arc<UserService>> {
    ctx.data::<Arc<UserService>>()
        .map_err(|e| async_graphql::Error::new(format!("User service unavailable: {:?}", e)))
}

fn storage_error(operation: &'static str) -> impl FnOnce(RepositoryError) -> async_graphql::Error {
    move |e| {
        tracing::error!(operation, error = %e, "User storage operation failed");
        async_graphql::Error::new(e.to_string())
    }
}

#[derive(Default)]
pub struct UserQueries;

#[Object]
impl UserQueries {
    /// Every stored user
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        user_service(ctx)?
            .find()
            .await
            .map_err(storage_error("users"))
    }

    /// A single user, or null if no user has this id
    async fn user(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<User>> {
        user_service(ctx)?
            .find_one_by_id(id)
            .await
            .map_err(storage_error("user"))
    }
}

#[derive(Default)]
pub struct UserMutations;

#[Object]
impl UserMutations {
    async fn create_user(&self, ctx: &Context<'_>, input: CreateUser) -> Result<User> {
        user_service(ctx)?
            .create(input)
            .await
            .map_err(storage_error("createUser"))
    }

    /// Returns the id when a user was deleted, null when it did not exist
    async fn delete_user(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Uuid>> {
        let deleted = user_service(ctx)?
            .delete(id)
            .await
            .map_err(storage_error("deleteUser"))?;
        Ok(deleted.then_some(id))
    }
}
