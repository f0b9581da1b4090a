//! User operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewUser, Role, User};
use crate::repository::Database;

impl Database {
    // ==================== User Operations ====================

    /// Insert a new user
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();

        // Check if user already exists
        let existing = self.get_user_by_username(&user.username).await?;
        if existing.is_some() {
            return Err(DbError::Duplicate(format!("User '{}' already exists", user.username)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.enabled)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DbError::unique_or(e, || format!("User '{}' already exists", user.username))
        })?;

        let id: i64 = result.get("id");

        Ok(User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            enabled: user.enabled,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a user by username
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, username, password_hash, enabled, created_at, updated_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, username, password_hash, enabled, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all users
    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, password_hash, enabled, created_at, updated_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| User::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Update user password
    pub async fn update_user_password(&self, id: i64, password_hash: &str) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Enable or disable a user
    pub async fn set_user_enabled(&self, id: i64, enabled: bool) -> Result<bool, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET enabled = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(enabled)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user together with its role links and sessions
    pub async fn delete_user(&self, id: i64) -> Result<bool, DbError> {
        sqlx::query("DELETE FROM user_role WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if any users exist
    pub async fn has_users(&self) -> Result<bool, DbError> {
        let result = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = result.get("count");
        Ok(count > 0)
    }

    // ==================== User Role Operations ====================

    /// Get the roles assigned to a user, ordered by role ID
    pub async fn get_user_roles(&self, user_id: i64) -> Result<Vec<Role>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT r.roleid, r.role
            FROM role r
            INNER JOIN user_role ur ON ur.roleid = r.roleid
            WHERE ur.user_id = ?
            ORDER BY r.roleid
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Role::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Assign a role to a user; assigning twice is a no-op
    pub async fn assign_role(&self, user_id: i64, roleid: i64) -> Result<(), DbError> {
        if self.get_user_by_id(user_id).await?.is_none() {
            return Err(DbError::NotFound(format!("User: {}", user_id)));
        }
        if self.get_role(roleid).await?.is_none() {
            return Err(DbError::NotFound(format!("Role: {}", roleid)));
        }

        sqlx::query("INSERT OR IGNORE INTO user_role (user_id, roleid) VALUES (?, ?)")
            .bind(user_id)
            .bind(roleid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the full role set of a user
    pub async fn set_user_roles(&self, user_id: i64, roleids: &[i64]) -> Result<(), DbError> {
        for roleid in roleids {
            if self.get_role(*roleid).await?.is_none() {
                return Err(DbError::NotFound(format!("Role: {}", roleid)));
            }
        }

        sqlx::query("DELETE FROM user_role WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        for roleid in roleids {
            self.assign_role(user_id, *roleid).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_user() {
        let db = Database::in_memory().await.unwrap();
        assert!(!db.has_users().await.unwrap());

        let user = db.insert_user(new_user("kalyan")).await.unwrap();
        assert!(db.has_users().await.unwrap());

        let by_name = db.get_user_by_username("kalyan").await.unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
        assert!(by_name.enabled);

        let by_id = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "kalyan");

        assert!(db.get_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.insert_user(new_user("kalyan")).await.unwrap();

        let result = db.insert_user(new_user("kalyan")).await;
        assert!(matches!(result, Err(DbError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_user_roles_roundtrip() {
        let db = Database::in_memory().await.unwrap();
        let user = db.insert_user(new_user("kalyan")).await.unwrap();
        let admin = db.ensure_role("ADMIN").await.unwrap();
        let member = db.ensure_role("USER").await.unwrap();

        db.assign_role(user.id, member.roleid).await.unwrap();
        db.assign_role(user.id, admin.roleid).await.unwrap();
        db.assign_role(user.id, admin.roleid).await.unwrap();

        let roles = db.get_user_roles(user.id).await.unwrap();
        assert_eq!(roles, vec![admin.clone(), member.clone()]);

        db.set_user_roles(user.id, &[member.roleid]).await.unwrap();
        assert_eq!(db.get_user_roles(user.id).await.unwrap(), vec![member.clone()]);

        // Deleting a role drops its links
        db.delete_role(member.roleid).await.unwrap();
        assert!(db.get_user_roles(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_unknown_role_fails() {
        let db = Database::in_memory().await.unwrap();
        let user = db.insert_user(new_user("kalyan")).await.unwrap();

        let result = db.assign_role(user.id, 42).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let db = Database::in_memory().await.unwrap();
        let user = db.insert_user(new_user("kalyan")).await.unwrap();

        assert!(db.update_user_password(user.id, "$2b$04$other").await.unwrap());
        assert!(db.set_user_enabled(user.id, false).await.unwrap());

        let reloaded = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "$2b$04$other");
        assert!(!reloaded.enabled);

        assert!(db.delete_user(user.id).await.unwrap());
        assert!(!db.delete_user(user.id).await.unwrap());
        assert!(db.list_users().await.unwrap().is_empty());
    }
}
