//! User Management HTTP API
//!
//! Axum routes for the user management service: the greeting endpoints,
//! form login and logout, actuator endpoints and the role and user
//! management API, all behind the session-based security filter.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppInfo, AppState, MetricsHandle};
