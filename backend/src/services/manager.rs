//! Services manager for long-running services.
//!
//! Services register with the manager and are started/stopped together.
//! Start order respects [dependencies](Service::dependencies); a service is only
//! started after all of its dependencies. Stop order is the reverse.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::services::database::{DatabaseService, DatabaseServiceConfig};
use crate::services::graphql::{GraphqlService, GraphqlServiceConfig};
use crate::services::http_server::{HttpServerConfig, HttpServerService};

/// Health status of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of a service health check.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServiceHealth {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// A service that can be started, stopped, and health-checked by the manager.
///
/// Use [tracing] for lifecycle logging and include the service name so logs
/// are filterable (e.g. `tracing::info!(service = "database", "Started")`).
///
/// Implement this for components that hold a long-lived connection (database
/// pool), a built artifact other services need (GraphQL schema), or a
/// background task (HTTP server). Stateless helpers such as
/// [UserService](crate::services::users::UserService) are constructed and
/// passed where needed instead.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Unique name for logging and lookup (e.g. "database", "graphql").
    fn name(&self) -> &str;

    /// Names of services that must be started before this one. Start order is
    /// computed from this; cycles are an error.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Report current health. Default returns [ServiceHealth::healthy].
    async fn health(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}

/// Pending registration for the builder.
pub enum ServiceRegistration {
    Database(DatabaseServiceConfig),
    Graphql(GraphqlServiceConfig),
    Http(HttpServerConfig),
    Service(Arc<dyn Service>),
}

/// Types that can be added to a [ServicesManagerBuilder] via
/// [add_service](ServicesManagerBuilder::add_service).
pub trait IntoServiceRegistration {
    #[doc(hidden)]
    fn into_registration(self) -> ServiceRegistration;
}

impl IntoServiceRegistration for DatabaseServiceConfig {
    fn into_registration(self) -> ServiceRegistration {
        ServiceRegistration::Database(self)
    }
}

impl IntoServiceRegistration for GraphqlServiceConfig {
    fn into_registration(self) -> ServiceRegistration {
        ServiceRegistration::Graphql(self)
    }
}

impl IntoServiceRegistration for HttpServerConfig {
    fn into_registration(self) -> ServiceRegistration {
        ServiceRegistration::Http(self)
    }
}

impl IntoServiceRegistration for Arc<dyn Service> {
    fn into_registration(self) -> ServiceRegistration {
        ServiceRegistration::Service(self)
    }
}

/// Builder for [ServicesManager]: add services with configs, then
/// [build](ServicesManagerBuilder::build) or [start](ServicesManagerBuilder::start).
///
/// # Example
///
/// ```ignore
/// let services = ServicesManager::builder()
///     .add_service(DatabaseServiceConfig::default())
///     .add_service(GraphqlServiceConfig { server_port: 3001, storage: StorageBackend::Sqlite })
///     .start()
///     .await?;
/// ```
#[derive(Default)]
pub struct ServicesManagerBuilder {
    registrations: Vec<ServiceRegistration>,
}

impl ServicesManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service: a config or a pre-built [Arc]\[[dyn](Service)\]. Config-based
    /// services are instantiated when [build](Self::build) or [start](Self::start) is called.
    pub fn add_service<T: IntoServiceRegistration>(mut self, t: T) -> Self {
        self.registrations.push(t.into_registration());
        self
    }

    /// Build the manager and register all services. Does not start them.
    pub async fn build(self) -> Result<Arc<ServicesManager>> {
        let manager = Arc::new(ServicesManager::new());
        for reg in self.registrations {
            match reg {
                ServiceRegistration::Database(config) => {
                    let db_svc = Arc::new(
                        DatabaseService::from_config(config)
                            .await
                            .context("Failed to create database service from config")?,
                    );
                    manager.register_database(db_svc).await;
                }
                ServiceRegistration::Graphql(config) => {
                    let graphql_svc = Arc::new(GraphqlService::new(manager.clone(), config));
                    manager.register_graphql(graphql_svc).await;
                }
                ServiceRegistration::Http(config) => {
                    let http_svc = Arc::new(HttpServerService::new(manager.clone(), config.config));
                    manager.register(http_svc).await;
                }
                ServiceRegistration::Service(svc) => {
                    manager.register(svc).await;
                }
            }
        }
        Ok(manager)
    }

    /// Build the manager, register all services, and start them in dependency order.
    pub async fn start(self) -> Result<Arc<ServicesManager>> {
        let manager = self.build().await?;
        manager.start_all().await?;
        Ok(manager)
    }
}

/// Registry and lifecycle controller for services.
#[derive(Default)]
pub struct ServicesManager {
    services: RwLock<HashMap<String, Arc<dyn Service>>>,
    started: RwLock<HashSet<String>>,
    database: RwLock<Option<Arc<DatabaseService>>>,
    graphql: RwLock<Option<Arc<GraphqlService>>>,
}

impl ServicesManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ServicesManagerBuilder {
        ServicesManagerBuilder::new()
    }

    /// Compute start order from dependencies (topological order).
    /// Returns an error on unknown deps or cycles.
    async fn start_order(&self) -> Result<Vec<String>> {
        let guard = self.services.read().await;
        let mut deps: HashMap<String, Vec<String>> = HashMap::new();
        for (name, svc) in guard.iter() {
            let d = svc.dependencies();
            if let Some(missing) = d.iter().find(|dep| !guard.contains_key(*dep)) {
                anyhow::bail!(
                    "Service {} depends on {} which is not registered",
                    name,
                    missing
                );
            }
            deps.insert(name.clone(), d);
        }
        drop(guard);

        // Kahn's algorithm: dependencies first. Names are sorted so the order is stable.
        let mut in_degree: HashMap<&str, usize> =
            deps.iter().map(|(name, d)| (name.as_str(), d.len())).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for (name, d) in &deps {
            for dep in d {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        ready.sort_unstable_by(|a, b| b.cmp(a));

        let mut order = Vec::with_capacity(deps.len());
        while let Some(n) = ready.pop() {
            order.push(n.to_string());
            let mut unlocked = Vec::new();
            for s in dependents.get(n).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(s) {
                    *deg -= 1;
                    if *deg == 0 {
                        unlocked.push(*s);
                    }
                }
            }
            ready.extend(unlocked);
            ready.sort_unstable_by(|a, b| b.cmp(a));
        }

        if order.len() != deps.len() {
            anyhow::bail!("Service dependency cycle detected");
        }
        Ok(order)
    }

    /// Register a service. Does not start it. If a service with the same name
    /// exists, it is replaced (the previous instance is not stopped).
    pub async fn register(&self, service: Arc<dyn Service>) {
        let name = service.name().to_string();
        let mut guard = self.services.write().await;
        if guard.insert(name.clone(), service).is_some() {
            warn!(service = %name, "Service '{}' reregistered, overwriting previous", name);
        } else {
            info!(service = %name, "Service '{}' registered", name);
        }
    }

    /// Register the database service. This is the only way to make
    /// [get_database](Self::get_database) return a value.
    pub async fn register_database(&self, service: Arc<DatabaseService>) {
        *self.database.write().await = Some(service.clone());
        self.register(service).await;
    }

    /// Register the GraphQL service so [get_graphql](Self::get_graphql) works.
    pub async fn register_graphql(&self, service: Arc<GraphqlService>) {
        *self.graphql.write().await = Some(service.clone());
        self.register(service).await;
    }

    /// Return the database service if it is registered and currently **started**.
    pub async fn get_database(&self) -> Option<Arc<DatabaseService>> {
        if !self.is_started("database").await {
            return None;
        }
        self.database.read().await.clone()
    }

    /// Return the GraphQL service if it is registered and currently **started**.
    pub async fn get_graphql(&self) -> Option<Arc<GraphqlService>> {
        if !self.is_started("graphql").await {
            return None;
        }
        self.graphql.read().await.clone()
    }

    /// Start all registered services in dependency order (dependencies first).
    /// Returns an error on unknown dependency, cycle, or if any start fails.
    pub async fn start_all(&self) -> Result<()> {
        let order = self.start_order().await?;
        for name in &order {
            let svc = {
                let g = self.services.read().await;
                g.get(name).cloned()
            };
            if let Some(s) = svc {
                if let Err(e) = s.start().await {
                    warn!(service = %name, error = %e, "Service '{}' start failed", name);
                    return Err(e).context(format!("failed to start service {}", name));
                }
                self.started.write().await.insert(name.clone());
                info!(service = %name, "Service '{}' started", name);
            }
        }
        Ok(())
    }

    /// Stop all registered services in reverse dependency order (dependents first).
    pub async fn stop_all(&self) -> Result<()> {
        let order = self.start_order().await?;
        for name in order.into_iter().rev() {
            let svc = {
                let g = self.services.read().await;
                g.get(&name).cloned()
            };
            if let Some(s) = svc {
                if let Err(e) = s.stop().await {
                    warn!(service = %name, error = %e, "Service '{}' stop failed", name);
                } else {
                    info!(service = %name, "Service '{}' stopped", name);
                }
                self.started.write().await.remove(&name);
            }
        }
        Ok(())
    }

    /// Health check for all registered services. Returns a map of name -> health.
    /// Services that return an error from [health](Service::health) are reported as
    /// [Unhealthy](HealthStatus::Unhealthy) with the error message.
    pub async fn health_all(&self) -> HashMap<String, ServiceHealth> {
        let services: Vec<(String, Arc<dyn Service>)> = {
            let guard = self.services.read().await;
            guard.iter().map(|(n, s)| (n.clone(), s.clone())).collect()
        };
        let mut out = HashMap::new();
        for (name, svc) in services {
            let h = match svc.health().await {
                Ok(h) => h,
                Err(e) => ServiceHealth::unhealthy(e.to_string()),
            };
            out.insert(name, h);
        }
        out
    }

    /// Return whether the given service is currently started (tracked by the manager).
    pub async fn is_started(&self, name: &str) -> bool {
        self.started.read().await.contains(name)
    }
}
