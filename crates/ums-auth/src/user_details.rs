//! User-detail lookup
//!
//! The authentication manager and the session manager only see users
//! through [`UserDetailsService`], which flattens a stored user and its
//! role links into one record.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ums_db::{Database, User};

use crate::error::AuthError;

const ROLE_PREFIX: &str = "ROLE_";

/// A user as seen by the security layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub enabled: bool,
    /// Role labels as stored, e.g. `ADMIN`
    pub roles: Vec<String>,
}

impl UserDetails {
    pub fn from_user(user: User, roles: Vec<String>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            password_hash: user.password_hash,
            enabled: user.enabled,
            roles,
        }
    }

    /// Check a role; `ADMIN` and `ROLE_ADMIN` are equivalent
    pub fn has_role(&self, role: &str) -> bool {
        has_role(&self.roles, role)
    }

    /// Role labels in `ROLE_` authority form
    pub fn authorities(&self) -> Vec<String> {
        self.roles
            .iter()
            .map(|r| format!("{}{}", ROLE_PREFIX, strip_role_prefix(r)))
            .collect()
    }
}

pub(crate) fn has_role(roles: &[String], role: &str) -> bool {
    let wanted = strip_role_prefix(role);
    roles.iter().any(|r| strip_role_prefix(r) == wanted)
}

fn strip_role_prefix(role: &str) -> &str {
    role.strip_prefix(ROLE_PREFIX).unwrap_or(role)
}

/// Loads users for authentication
#[async_trait]
pub trait UserDetailsService: Send + Sync {
    async fn load_user_by_username(&self, username: &str) -> Result<Option<UserDetails>, AuthError>;

    async fn load_user_by_id(&self, id: i64) -> Result<Option<UserDetails>, AuthError>;
}

/// [`UserDetailsService`] backed by the users and roles tables
#[derive(Clone)]
pub struct DatabaseUserDetailsService {
    db: Database,
}

impl DatabaseUserDetailsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn with_roles(&self, user: Option<User>) -> Result<Option<UserDetails>, AuthError> {
        let Some(user) = user else {
            return Ok(None);
        };
        let roles = self
            .db
            .get_user_roles(user.id)
            .await?
            .into_iter()
            .map(|r| r.role)
            .collect();
        Ok(Some(UserDetails::from_user(user, roles)))
    }
}

#[async_trait]
impl UserDetailsService for DatabaseUserDetailsService {
    async fn load_user_by_username(&self, username: &str) -> Result<Option<UserDetails>, AuthError> {
        let user = self.db.get_user_by_username(username).await?;
        self.with_roles(user).await
    }

    async fn load_user_by_id(&self, id: i64) -> Result<Option<UserDetails>, AuthError> {
        let user = self.db.get_user_by_id(id).await?;
        self.with_roles(user).await
    }
}
