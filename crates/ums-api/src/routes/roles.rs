//! Role management routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::{debug, info};
use ums_auth::CurrentUser;
use ums_db::{NewRole, Role};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAdmin;
use super::types::RoleRequest;

/// GET /roles
async fn list_roles(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(state.db.list_roles().await?))
}

/// POST /roles (Admin only)
async fn create_role(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<RoleRequest>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    debug!("Creating role: {}", request.role);

    let role = state.db.insert_role(NewRole { role: request.role }).await?;
    info!("Created {}", role);

    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /roles/{roleid}
async fn get_role(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(roleid): Path<i64>,
) -> Result<Json<Role>, ApiError> {
    state
        .db
        .get_role(roleid)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Role: {}", roleid)))
}

/// PUT /roles/{roleid} (Admin only)
async fn update_role(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(roleid): Path<i64>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<Role>, ApiError> {
    if !state.db.update_role(roleid, &request.role).await? {
        return Err(ApiError::NotFound(format!("Role: {}", roleid)));
    }

    let role = state
        .db
        .get_role(roleid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Role: {}", roleid)))?;
    info!("Updated {}", role);

    Ok(Json(role))
}

/// DELETE /roles/{roleid} (Admin only)
async fn delete_role(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(roleid): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_role(roleid).await? {
        info!("Deleted role: {}", roleid);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Role: {}", roleid)))
    }
}

/// Create role routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{roleid}",
            get(get_role).put(update_role).delete(delete_role),
        )
}
