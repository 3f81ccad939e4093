//! HTTP server service: binds the Axum app and runs it in a background task.
//!
//! Depends on the GraphQL service (and, with SQLite storage, transitively on
//! the database). This service builds [AppState](crate::app::AppState) and the
//! router in [start](Service::start) and serves until [stop](Service::stop).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::app::{AppState, build_app};
use crate::config::Config;
use crate::services::manager::{Service, ServiceHealth, ServicesManager};

/// Configuration for the HTTP server service (bind address and app config).
#[derive(Clone)]
pub struct HttpServerConfig {
    pub config: Arc<Config>,
}

/// HTTP server service: binds and serves the Axum app in a background task.
pub struct HttpServerService {
    manager: Arc<ServicesManager>,
    config: Arc<Config>,
    /// JoinHandle for the server task; set in start(), taken in stop().
    join_handle: parking_lot::RwLock<Option<tokio::task::JoinHandle<Result<()>>>>,
    /// Send to trigger graceful shutdown; set in start(), taken in stop().
    shutdown_tx: parking_lot::RwLock<Option<broadcast::Sender<()>>>,
}

impl HttpServerService {
    pub fn new(manager: Arc<ServicesManager>, config: Arc<Config>) -> Self {
        Self {
            manager,
            config,
            join_handle: parking_lot::RwLock::new(None),
            shutdown_tx: parking_lot::RwLock::new(None),
        }
    }

    fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        addr.parse()
            .with_context(|| format!("HTTP server: invalid bind address {}", addr))
    }
}

#[async_trait]
impl Service for HttpServerService {
    fn name(&self) -> &str {
        "http"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["graphql".to_string()]
    }

    async fn start(&self) -> Result<()> {
        info!(service = "http", "HTTP server service starting");

        let gql = self
            .manager
            .get_graphql()
            .await
            .ok_or_else(|| anyhow::anyhow!("graphql service not available"))?;
        let schema = gql
            .schema()
            .await
            .ok_or_else(|| anyhow::anyhow!("graphql schema not built"))?;

        let state = AppState {
            schema,
            services: self.manager.clone(),
        };

        let app = build_app(state);
        let addr = self.bind_addr()?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("HTTP server: bind {} failed", addr))?;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let mut shutdown_rx = shutdown_tx.subscribe();

        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .context("axum::serve")
        });

        *self.join_handle.write() = Some(join);
        *self.shutdown_tx.write() = Some(shutdown_tx);

        info!(
            service = "http",
            "Listening on http://{}; GraphQL: http://{}/graphql", addr, addr
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let tx = self.shutdown_tx.write().take();
        let handle = self.join_handle.write().take();
        if let Some(tx) = tx {
            let _ = tx.send(());
        }
        if let Some(h) = handle {
            match h.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(service = "http", error = %e, "Server exited with error"),
                Err(e) => warn!(service = "http", error = %e, "Server task panicked"),
            }
        }
        info!(service = "http", "HTTP server service stopped");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        match self.join_handle.read().as_ref() {
            Some(h) if !h.is_finished() => Ok(ServiceHealth::healthy()),
            Some(_) => Ok(ServiceHealth::unhealthy("server task exited")),
            None => Ok(ServiceHealth::unhealthy("server task not running")),
        }
    }
}
