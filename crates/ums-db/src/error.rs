//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Map a UNIQUE constraint failure to [`DbError::Duplicate`]
    ///
    /// Covers writers that pass the existence check concurrently and
    /// collide on the constraint.
    pub(crate) fn unique_or(e: sqlx::Error, duplicate: impl FnOnce() -> String) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate(duplicate()),
            _ => Self::Connection(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("INSERT INTO role (role) VALUES ('ADMIN')")
            .execute(db.pool())
            .await
            .unwrap();

        // Second writer that skipped the existence check
        let err = sqlx::query("INSERT INTO role (role) VALUES ('ADMIN')")
            .execute(db.pool())
            .await
            .unwrap_err();
        let mapped = DbError::unique_or(err, || "Role 'ADMIN' already exists".to_string());
        assert!(matches!(mapped, DbError::Duplicate(msg) if msg.contains("ADMIN")));
    }

    #[tokio::test]
    async fn test_other_errors_stay_connection_errors() {
        let db = Database::in_memory().await.unwrap();
        let err = sqlx::query("INSERT INTO missing_table (x) VALUES (1)")
            .execute(db.pool())
            .await
            .unwrap_err();
        let mapped = DbError::unique_or(err, || "unused".to_string());
        assert!(matches!(mapped, DbError::Connection(_)));
    }
}
