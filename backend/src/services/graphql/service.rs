//! GraphQL service: owns schema building and exposes HTTP routes for /graphql.
//!
//! With SQLite storage it depends on the database service and builds the
//! schema in [start](Service::start) after the pool is available. Main wires
//! routes by merging [Self::router] into the app and uses [Self::schema] to
//! build [AppState](crate::app::AppState).

use std::sync::Arc;

use anyhow::Result;
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::RwLock;
use tracing::info;

use crate::app::AppState;
use crate::config::StorageBackend;
use crate::services::manager::{Service, ServiceHealth, ServicesManager};
use crate::services::users::UserService;

use super::entities::User;
use super::orm::{InMemoryRepository, Repository, SqliteRepository};
use super::{UserSchema, build_schema};

/// Configuration for the GraphQL service.
#[derive(Debug, Clone)]
pub struct GraphqlServiceConfig {
    /// Server port, used for the playground URL log line
    pub server_port: u16,
    pub storage: StorageBackend,
}

/// GraphQL service: builds and holds the schema, provides routes for the playground and API.
pub struct GraphqlService {
    manager: Arc<ServicesManager>,
    config: GraphqlServiceConfig,
    schema: RwLock<Option<UserSchema>>,
}

impl GraphqlService {
    pub fn new(manager: Arc<ServicesManager>, config: GraphqlServiceConfig) -> Self {
        Self {
            manager,
            config,
            schema: RwLock::new(None),
        }
    }

    /// Return the built schema, if the service has been started.
    pub async fn schema(&self) -> Option<UserSchema> {
        self.schema.read().await.clone()
    }

    /// Return a router with /graphql. Merge this into the app and call
    /// `.with_state(state)` on the combined router so handlers receive [AppState].
    pub fn router() -> Router<AppState> {
        Router::new().route("/graphql", get(graphiql).post(graphql_handler))
    }

    async fn repository(&self) -> Result<Arc<dyn Repository<User>>> {
        match self.config.storage {
            StorageBackend::Sqlite => {
                let pool = self
                    .manager
                    .get_database()
                    .await
                    .map(|svc| svc.pool().clone())
                    .ok_or_else(|| anyhow::anyhow!("database service not available"))?;
                Ok(Arc::new(SqliteRepository::<User>::new(pool)))
            }
            StorageBackend::Memory => Ok(Arc::new(InMemoryRepository::<User>::new())),
        }
    }
}

async fn graphiql(headers: HeaderMap) -> impl IntoResponse {
    let accepts_html = headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        axum::response::Html(GraphiQLSource::build().endpoint("/graphql").finish()).into_response()
    } else {
        (
            axum::http::StatusCode::METHOD_NOT_ALLOWED,
            axum::Json(serde_json::json!({
                "error": "GET requests are not supported for GraphQL queries. Use POST with Content-Type: application/json"
            })),
        )
            .into_response()
    }
}

async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

#[async_trait]
impl Service for GraphqlService {
    fn name(&self) -> &str {
        "graphql"
    }

    fn dependencies(&self) -> Vec<String> {
        match self.config.storage {
            StorageBackend::Sqlite => vec!["database".to_string()],
            StorageBackend::Memory => Vec::new(),
        }
    }

    async fn start(&self) -> Result<()> {
        info!(service = "graphql", storage = ?self.config.storage, "GraphQL service starting");
        let repository = self.repository().await?;
        let schema = build_schema(Arc::new(UserService::new(repository)));
        *self.schema.write().await = Some(schema);
        info!(service = "graphql", "GraphQL service started");
        info!(
            service = "graphql",
            "GraphQL playground: http://localhost:{}/graphql",
            self.config.server_port
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        *self.schema.write().await = None;
        info!(service = "graphql", "Stopped");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        if self.schema.read().await.is_some() {
            Ok(ServiceHealth::healthy())
        } else {
            Ok(ServiceHealth::unhealthy("schema not built (start not called)"))
        }
    }
}
