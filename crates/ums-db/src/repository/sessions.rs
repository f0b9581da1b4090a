//! Login session operations

use chrono::{DateTime, Utc};

use crate::error::DbError;
use crate::models::{NewSession, Session};
use crate::utils::format_sortable;

use super::Database;

impl Database {
    /// Create a new login session
    pub async fn create_session(&self, session: NewSession) -> Result<Session, DbError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, created_at, last_accessed_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(format_sortable(now))
        .bind(format_sortable(now))
        .bind(format_sortable(session.expires_at))
        .execute(&self.pool)
        .await?;

        Ok(Session {
            id: session.id,
            user_id: session.user_id,
            created_at: now,
            last_accessed_at: now,
            expires_at: session.expires_at,
        })
    }

    /// Get a session by ID, expired or not
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, created_at, last_accessed_at, expires_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Session::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Record access to a session and move its expiry
    pub async fn touch_session(&self, id: &str, expires_at: DateTime<Utc>) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET last_accessed_at = ?, expires_at = ?
            WHERE id = ?
            "#,
        )
        .bind(format_sortable(now))
        .bind(format_sortable(expires_at))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a session
    pub async fn delete_session(&self, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session of a user
    pub async fn delete_user_sessions(&self, user_id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions whose expiry is at or before `now`
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(format_sortable(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
