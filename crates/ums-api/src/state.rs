//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use ums_auth::{AuthenticationManager, SessionManager, WebSecurity};
use ums_db::Database;

/// Prometheus handle used to render `/actuator/prometheus`
pub type MetricsHandle = PrometheusHandle;

/// Application name and version reported by the info endpoints
#[derive(Debug, Clone)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "usermgmt".to_string(),
            version: "V1".to_string(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthenticationManager>,
    pub sessions: Arc<SessionManager>,
    pub security: Arc<WebSecurity>,
    pub info: AppInfo,
}

impl AppState {
    pub fn new(
        db: Database,
        auth: Arc<AuthenticationManager>,
        security: Arc<WebSecurity>,
        info: AppInfo,
    ) -> Self {
        Self {
            db,
            auth,
            sessions: security.sessions().clone(),
            security,
            info,
        }
    }
}
