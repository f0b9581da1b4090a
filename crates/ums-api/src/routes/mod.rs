//! API routes

mod auth;
mod health;
pub mod hello;
mod login;
pub mod metrics;
mod roles;
mod types;
mod users;

use axum::{Router, middleware};
use std::sync::Arc;
use ums_auth::security_filter;

use crate::state::{AppState, MetricsHandle};

pub use auth::ADMIN_ROLE;

/// Create the main router
///
/// Every route, including unknown paths, sits behind the security filter.
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let security = state.security.clone();

    let mut router = Router::new()
        .merge(hello::routes())
        .merge(health::routes())
        .merge(login::routes())
        .merge(roles::routes())
        .merge(users::routes())
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router.layer(middleware::from_fn_with_state(security, security_filter))
}
