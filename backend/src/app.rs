//! Application state and HTTP router construction.
//!
//! Used by [HttpServerService](crate::services::http_server::HttpServerService)
//! to build the Axum app.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::services::graphql::{GraphqlService, UserSchema};
use crate::services::manager::ServicesManager;

/// Shared state for HTTP handlers (GraphQL, health routes).
#[derive(Clone)]
pub struct AppState {
    pub schema: UserSchema,
    pub services: Arc<ServicesManager>,
}

/// Build the full Axum router: health routes, /graphql, and layers.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(api::health::router())
        .merge(GraphqlService::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
