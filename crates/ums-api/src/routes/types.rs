//! Request/Response DTOs

use serde::{Deserialize, Serialize};
use ums_db::{Role, User};

/// Maximum allowed username length
pub const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum allowed password length, bcrypt's input limit in bytes
pub const MAX_PASSWORD_LENGTH: usize = ums_auth::MAX_PASSWORD_BYTES;
/// Minimum allowed password length
pub const MIN_PASSWORD_LENGTH: usize = ums_auth::MIN_PASSWORD_LENGTH;

// ==================== Login Types ====================

/// Form login submission
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ==================== Role Types ====================

/// Create or rename role request
#[derive(Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

// ==================== User Types ====================

/// Create user request
#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Update user request
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub enabled: Option<bool>,
    pub roles: Option<Vec<String>>,
}

/// User response (without password)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub enabled: bool,
    pub roles: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    pub fn new(user: User, roles: Vec<Role>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            enabled: user.enabled,
            roles: roles.into_iter().map(|r| r.role).collect(),
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}
