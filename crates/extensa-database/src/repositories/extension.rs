//! Extension registry repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use extensa_core::error::{AppError, ErrorKind};
use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;
use extensa_entity::extension::{Extension, ExtensionStatus, NewExtension};

use crate::store::ExtensionStore;

/// Repository for installed extension rows.
#[derive(Debug, Clone)]
pub struct ExtensionRepository {
    pool: PgPool,
}

impl ExtensionRepository {
    /// Create a new extension repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a write failure, turning a `(name, version)` unique violation into
/// `CONFLICT`.
fn map_write_error(e: sqlx::Error, key: &str) -> AppError {
    let unique = e
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);
    if unique {
        AppError::conflict(format!("Extension '{key}' is already installed"))
    } else {
        AppError::with_source(ErrorKind::Database, "Failed to write extension", e)
    }
}

#[async_trait]
impl ExtensionStore for ExtensionRepository {
    async fn insert(&self, new: &NewExtension) -> AppResult<Extension> {
        let manifest = &new.manifest;
        sqlx::query_as::<_, Extension>(
            "INSERT INTO extensions \
                (name, version, status, is_enabled, extension_type, file_path, manifest) \
             VALUES ($1, $2, $3, FALSE, $4, $5, $6) RETURNING *",
        )
        .bind(&manifest.name)
        .bind(&manifest.version)
        .bind(new.status)
        .bind(manifest.extension_type)
        .bind(&new.file_path)
        .bind(Json(manifest))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &new.key()))
    }

    async fn find_by_id(&self, id: ExtensionId) -> AppResult<Option<Extension>> {
        sqlx::query_as::<_, Extension>("SELECT * FROM extensions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find extension", e))
    }

    async fn find_by_key(&self, name: &str, version: &str) -> AppResult<Option<Extension>> {
        sqlx::query_as::<_, Extension>("SELECT * FROM extensions WHERE name = $1 AND version = $2")
            .bind(name)
            .bind(version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find extension", e))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Extension>> {
        sqlx::query_as::<_, Extension>("SELECT * FROM extensions WHERE name = $1 ORDER BY id ASC")
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find extensions", e)
            })
    }

    async fn list(&self) -> AppResult<Vec<Extension>> {
        sqlx::query_as::<_, Extension>("SELECT * FROM extensions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list extensions", e)
            })
    }

    async fn update_state(
        &self,
        id: ExtensionId,
        status: ExtensionStatus,
        is_enabled: bool,
    ) -> AppResult<Extension> {
        sqlx::query_as::<_, Extension>(
            "UPDATE extensions SET status = $2, is_enabled = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .bind(is_enabled)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update extension", e))?
        .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))
    }

    async fn replace(&self, id: ExtensionId, new: &NewExtension) -> AppResult<Extension> {
        let manifest = &new.manifest;
        sqlx::query_as::<_, Extension>(
            "UPDATE extensions SET status = $2, is_enabled = FALSE, extension_type = $3, \
                file_path = $4, manifest = $5, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(new.status)
        .bind(manifest.extension_type)
        .bind(&new.file_path)
        .bind(Json(manifest))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &new.key()))?
        .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))
    }

    async fn delete(&self, id: ExtensionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM extensions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete extension", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
