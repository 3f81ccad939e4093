//! Health check endpoints

use std::collections::HashMap;

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::app::AppState;
use crate::services::manager::ServiceHealth;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub services: HashMap<String, ServiceHealth>,
}

/// Health check - always returns OK if the server is running
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - every registered service must report healthy
async fn readyz(State(state): State<AppState>) -> Json<ReadyResponse> {
    let services = state.services.health_all().await;
    let ready = services.values().all(ServiceHealth::is_healthy);

    Json(ReadyResponse { ready, services })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
