//! User management routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::{debug, info};
use ums_auth::CurrentUser;
use ums_db::{Database, NewUser, User};

use crate::error::ApiError;
use crate::state::AppState;

use super::auth::RequireAdmin;
use super::types::{
    CreateUserRequest, MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH,
    UpdateUserRequest, UserResponse,
};

// ==================== Input Validation ====================

/// Validate username format and length
fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username cannot be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username exceeds maximum length of {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    // Only allow alphanumeric characters, underscores, dots and hyphens
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ApiError::BadRequest(
            "Username can only contain alphanumeric characters, underscores, dots and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate password length
fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Map role labels to role ids, rejecting unknown labels
async fn resolve_role_ids(db: &Database, labels: &[String]) -> Result<Vec<i64>, ApiError> {
    let mut ids = Vec::with_capacity(labels.len());
    for label in labels {
        let role = db
            .get_role_by_label(label.trim())
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {}", label)))?;
        if !ids.contains(&role.roleid) {
            ids.push(role.roleid);
        }
    }
    Ok(ids)
}

async fn user_response(db: &Database, user: User) -> Result<UserResponse, ApiError> {
    let roles = db.get_user_roles(user.id).await?;
    Ok(UserResponse::new(user, roles))
}

async fn load_user(db: &Database, id: i64) -> Result<User, ApiError> {
    db.get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))
}

// ==================== User Routes ====================

/// GET /users
async fn list_users(
    _user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users().await?;

    let mut responses = Vec::with_capacity(users.len());
    for user in users {
        responses.push(user_response(&state.db, user).await?);
    }
    Ok(Json(responses))
}

/// POST /users (Admin only)
async fn create_user(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_username(&request.username)?;
    validate_password(&request.password)?;

    debug!("Creating user: {}", request.username);

    let role_ids = resolve_role_ids(&state.db, &request.roles).await?;
    let password_hash = state.auth.encode_password(&request.password).await?;

    let user = state
        .db
        .insert_user(NewUser {
            username: request.username,
            password_hash,
            enabled: true,
        })
        .await?;
    state.db.set_user_roles(user.id, &role_ids).await?;

    info!("Created user: {}", user.username);

    Ok((StatusCode::CREATED, Json(user_response(&state.db, user).await?)))
}

/// GET /users/me
async fn current_user(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state.db, user.id).await?;
    Ok(Json(user_response(&state.db, user).await?))
}

/// GET /users/{id}
async fn get_user(
    _user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = load_user(&state.db, id).await?;
    Ok(Json(user_response(&state.db, user).await?))
}

/// PUT /users/{id} (Admin only)
async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!("Updating user: {}", id);

    load_user(&state.db, id).await?;

    if let Some(password) = &request.password {
        validate_password(password)?;
    }
    let role_ids = match &request.roles {
        Some(labels) => Some(resolve_role_ids(&state.db, labels).await?),
        None => None,
    };
    if id == admin.id && request.enabled == Some(false) {
        return Err(ApiError::BadRequest("Cannot disable your own account".to_string()));
    }

    if let Some(password) = &request.password {
        let password_hash = state.auth.encode_password(password).await?;
        state.db.update_user_password(id, &password_hash).await?;
    }

    if let Some(enabled) = request.enabled {
        state.db.set_user_enabled(id, enabled).await?;
        if !enabled {
            state.db.delete_user_sessions(id).await?;
        }
    }

    if let Some(role_ids) = role_ids {
        state.db.set_user_roles(id, &role_ids).await?;
    }

    let user = load_user(&state.db, id).await?;
    info!("Updated user: {}", user.username);

    Ok(Json(user_response(&state.db, user).await?))
}

/// DELETE /users/{id} (Admin only)
async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if id == admin.id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    debug!("Deleting user: {}", id);

    if state.db.delete_user(id).await? {
        info!("Deleted user: {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("User: {}", id)))
    }
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(current_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}
