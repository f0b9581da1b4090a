//! Role operations

use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewRole, Role};
use crate::repository::Database;
use crate::utils::normalize_role_label;

impl Database {
    // ==================== Role Operations ====================

    /// Insert a new role; the store assigns `roleid`
    pub async fn insert_role(&self, role: NewRole) -> Result<Role, DbError> {
        let label = normalize_role_label(&role.role)
            .ok_or_else(|| DbError::Invalid("Role label cannot be empty".to_string()))?;

        if self.get_role_by_label(&label).await?.is_some() {
            return Err(DbError::Duplicate(format!("Role '{}' already exists", label)));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO role (role)
            VALUES (?)
            RETURNING roleid
            "#,
        )
        .bind(&label)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::unique_or(e, || format!("Role '{}' already exists", label)))?;

        let roleid: i64 = result.get("roleid");

        Ok(Role { roleid, role: label })
    }

    /// Get a role by ID
    pub async fn get_role(&self, roleid: i64) -> Result<Option<Role>, DbError> {
        let result = sqlx::query("SELECT roleid, role FROM role WHERE roleid = ?")
            .bind(roleid)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Role::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a role by its label
    pub async fn get_role_by_label(&self, label: &str) -> Result<Option<Role>, DbError> {
        let result = sqlx::query("SELECT roleid, role FROM role WHERE role = ?")
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Role::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all roles ordered by ID
    pub async fn list_roles(&self) -> Result<Vec<Role>, DbError> {
        let rows = sqlx::query("SELECT roleid, role FROM role ORDER BY roleid")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Role::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Update the label of a role; `roleid` is left untouched
    pub async fn update_role(&self, roleid: i64, label: &str) -> Result<bool, DbError> {
        let label = normalize_role_label(label)
            .ok_or_else(|| DbError::Invalid("Role label cannot be empty".to_string()))?;

        if let Some(existing) = self.get_role_by_label(&label).await?
            && existing.roleid != roleid
        {
            return Err(DbError::Duplicate(format!("Role '{}' already exists", label)));
        }

        let result = sqlx::query("UPDATE role SET role = ? WHERE roleid = ?")
            .bind(&label)
            .bind(roleid)
            .execute(&self.pool)
            .await
            .map_err(|e| DbError::unique_or(e, || format!("Role '{}' already exists", label)))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a role and its user links
    pub async fn delete_role(&self, roleid: i64) -> Result<bool, DbError> {
        sqlx::query("DELETE FROM user_role WHERE roleid = ?")
            .bind(roleid)
            .execute(&self.pool)
            .await?;

        let result = sqlx::query("DELETE FROM role WHERE roleid = ?")
            .bind(roleid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert a role unless a role with the same label exists
    pub async fn ensure_role(&self, label: &str) -> Result<Role, DbError> {
        match self.get_role_by_label(label.trim()).await? {
            Some(role) => Ok(role),
            None => {
                self.insert_role(NewRole {
                    role: label.to_string(),
                })
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_role_persisted_then_reloaded() {
        let db = Database::in_memory().await.unwrap();

        let created = db
            .insert_role(NewRole {
                role: "ADMIN".to_string(),
            })
            .await
            .unwrap();
        assert!(created.roleid > 0);

        let reloaded = db.get_role(created.roleid).await.unwrap().unwrap();
        assert_eq!(reloaded.roleid, created.roleid);
        assert_eq!(reloaded.role, "ADMIN");
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let db = Database::in_memory().await.unwrap();

        let a = db.insert_role(NewRole { role: "A".to_string() }).await.unwrap();
        let b = db.insert_role(NewRole { role: "B".to_string() }).await.unwrap();
        assert_ne!(a.roleid, b.roleid);

        // Deleted ids are not reused
        assert!(db.delete_role(b.roleid).await.unwrap());
        let c = db.insert_role(NewRole { role: "C".to_string() }).await.unwrap();
        assert!(c.roleid > b.roleid);
    }

    #[tokio::test]
    async fn test_duplicate_and_empty_labels_rejected() {
        let db = Database::in_memory().await.unwrap();
        db.insert_role(NewRole { role: "USER".to_string() }).await.unwrap();

        let dup = db.insert_role(NewRole { role: " USER ".to_string() }).await;
        assert!(matches!(dup, Err(DbError::Duplicate(_))));

        let empty = db.insert_role(NewRole { role: "  ".to_string() }).await;
        assert!(matches!(empty, Err(DbError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_update_role_keeps_id() {
        let db = Database::in_memory().await.unwrap();
        let role = db.insert_role(NewRole { role: "EDITOR".to_string() }).await.unwrap();

        assert!(db.update_role(role.roleid, "AUTHOR").await.unwrap());
        let reloaded = db.get_role(role.roleid).await.unwrap().unwrap();
        assert_eq!(reloaded.roleid, role.roleid);
        assert_eq!(reloaded.role, "AUTHOR");

        assert!(!db.update_role(9999, "GHOST").await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_role_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let first = db.ensure_role("ADMIN").await.unwrap();
        let second = db.ensure_role("ADMIN").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(db.list_roles().await.unwrap().len(), 1);
    }
}
