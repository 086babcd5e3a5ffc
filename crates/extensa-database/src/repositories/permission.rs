//! Permission repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use extensa_core::error::{AppError, ErrorKind};
use extensa_core::result::AppResult;
use extensa_core::types::{PermissionId, UserId};
use extensa_entity::permission::{EntityRef, NewPermission, Permission};

use crate::store::PermissionStore;

/// Repository for permission rows.
///
/// The `(user_id, entity_type, entity_id)` uniqueness constraint makes a
/// grant a single `INSERT ... ON CONFLICT DO UPDATE`, so concurrent grants
/// on the same tuple serialize on the row and the last writer wins.
#[derive(Debug, Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    /// Create a new permission repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn find(&self, user_id: UserId, entity: &EntityRef) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions \
             WHERE user_id = $1 AND entity_type = $2 AND entity_id = $3",
        )
        .bind(user_id)
        .bind(&entity.entity_type)
        .bind(&entity.entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find permission", e))
    }

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find permission", e)
            })
    }

    async fn upsert(&self, grant: &NewPermission) -> AppResult<Permission> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions \
                (id, user_id, entity_type, entity_id, permission_level, granted_by, granted_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), $7) \
             ON CONFLICT (user_id, entity_type, entity_id) DO UPDATE SET \
                permission_level = EXCLUDED.permission_level, \
                granted_by = EXCLUDED.granted_by, \
                granted_at = EXCLUDED.granted_at, \
                expires_at = EXCLUDED.expires_at \
             RETURNING *",
        )
        .bind(PermissionId::new())
        .bind(grant.user_id)
        .bind(&grant.entity.entity_type)
        .bind(&grant.entity.entity_id)
        .bind(grant.level)
        .bind(grant.granted_by)
        .bind(grant.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to upsert permission", e))
    }

    async fn delete(&self, id: PermissionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete permission", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_for_entity(&self, entity: &EntityRef) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY granted_at ASC",
        )
        .bind(&entity.entity_type)
        .bind(&entity.entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list permissions", e))
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE user_id = $1 \
             ORDER BY entity_type ASC, entity_id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list permissions", e))
    }

    async fn count_for_entity(&self, entity: &EntityRef) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(&entity.entity_type)
        .bind(&entity.entity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count permissions", e)
        })?;
        Ok(count.max(0) as u64)
    }

    async fn delete_for_entity(&self, entity: &EntityRef) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM permissions WHERE entity_type = $1 AND entity_id = $2")
                .bind(&entity.entity_type)
                .bind(&entity.entity_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete permissions", e)
                })?;
        Ok(result.rows_affected())
    }
}
