//! Health and actuator endpoints

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

use crate::state::AppState;

/// Component health status
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
}

/// Actuator health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

/// Actuator info response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub app: AppDetails,
}

#[derive(Debug, Serialize)]
pub struct AppDetails {
    pub name: String,
    pub version: String,
}

/// GET /health
async fn health() -> &'static str {
    metrics::counter!("ums_health_checks_total").increment(1);
    "UP"
}

/// GET /actuator/health
async fn actuator_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    metrics::counter!("ums_health_checks_total").increment(1);

    let (status, code) = match state.db.ping().await {
        Ok(()) => ("UP", StatusCode::OK),
        Err(e) => {
            warn!("Database health check failed: {}", e);
            ("DOWN", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let mut components = BTreeMap::new();
    components.insert("db", ComponentHealth { status });

    (code, Json(HealthResponse { status, components }))
}

/// GET /actuator/info
async fn actuator_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        app: AppDetails {
            name: state.info.name.clone(),
            version: state.info.version.clone(),
        },
    })
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/actuator/health", get(actuator_health))
        .route("/actuator/info", get(actuator_info))
}
