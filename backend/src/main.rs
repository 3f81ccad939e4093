//! Usergraph - GraphQL CRUD service for user records
//!
//! All operations are exposed via GraphQL at /graphql.

mod api;
mod app;
mod config;
mod db;
mod services;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat, StorageBackend};
use crate::services::ServicesManager;
use crate::services::database::DatabaseServiceConfig;
use crate::services::graphql::GraphqlServiceConfig;
use crate::services::http_server::HttpServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);

    let (json_layer, pretty_layer) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Pretty => (None, Some(tracing_subscriber::fmt::layer().pretty())),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "usergraph=debug,tower_http=debug".into()),
        )
        .with(json_layer)
        .with(pretty_layer)
        .init();

    tracing::info!("Starting Usergraph");
    tracing::info!(storage = ?config.storage_backend, "Configuration loaded");

    let mut builder = ServicesManager::builder();
    if config.storage_backend == StorageBackend::Sqlite {
        builder = builder.add_service(DatabaseServiceConfig {
            database_url: config.database_url.clone(),
            max_connections: config.database_max_connections,
            connect_timeout: config.database_connect_timeout,
        });
    }
    let services = builder
        .add_service(GraphqlServiceConfig {
            server_port: config.port,
            storage: config.storage_backend,
        })
        .add_service(HttpServerConfig {
            config: config.clone(),
        })
        .start()
        .await
        .context("Failed to start services")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    services.stop_all().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
