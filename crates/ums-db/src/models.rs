//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;

/// Role model
///
/// `roleid` is assigned by the store on insert and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub roleid: i64,
    pub role: String,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Role [roleid={}, role={}]", self.roleid, self.role)
    }
}

/// New role (for insertion)
#[derive(Debug, Clone)]
pub struct NewRole {
    pub role: String,
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub enabled: bool,
}

/// Login session model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token, also used as the cookie value
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// New session (for insertion)
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for Role {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Role {
            roleid: row.try_get("roleid")?,
            role: row.try_get("role")?,
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            enabled: row.try_get("enabled")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Session {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            last_accessed_at: parse_datetime_or_now(
                &row.try_get::<String, _>("last_accessed_at")?,
            ),
            expires_at: parse_datetime_or_now(&row.try_get::<String, _>("expires_at")?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_display() {
        let role = Role {
            roleid: 3,
            role: "ADMIN".to_string(),
        };
        assert_eq!(role.to_string(), "Role [roleid=3, role=ADMIN]");
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            id: "abc".to_string(),
            user_id: 1,
            created_at: now,
            last_accessed_at: now,
            expires_at: now + Duration::minutes(30),
        };
        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::minutes(30)));
    }

    #[test]
    fn test_user_serialization_skips_password() {
        let now = Utc::now();
        let user = User {
            id: 1,
            username: "admin".to_string(),
            password_hash: "$2b$10$secret".to_string(),
            enabled: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"username\":\"admin\""));
    }
}
