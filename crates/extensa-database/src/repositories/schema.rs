//! PostgreSQL schema migrator for extension contributions.

use async_trait::async_trait;
use sqlx::{Executor, PgConnection, PgPool};
use tracing::info;

use extensa_core::error::{AppError, ErrorKind};
use extensa_core::result::AppResult;
use extensa_entity::extension::SchemaMigration;

use crate::store::SchemaMigrator;

/// Executes extension migrations and records them in
/// `extension_schema_migrations`.
///
/// Each migration runs in its own transaction together with its ledger row,
/// so a failed migration leaves neither its effects nor a record behind.
#[derive(Debug, Clone)]
pub struct PgSchemaMigrator {
    pool: PgPool,
}

impl PgSchemaMigrator {
    /// Create a new migrator.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn schema_error(message: String, e: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::SchemaError, message, e)
}

#[async_trait]
impl SchemaMigrator for PgSchemaMigrator {
    async fn apply(&self, owner: &str, migrations: &[SchemaMigration]) -> AppResult<usize> {
        let mut applied = 0;

        for migration in migrations {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| schema_error("Failed to begin schema transaction".into(), e))?;

            let already = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM extension_schema_migrations WHERE owner = $1 AND name = $2",
            )
            .bind(owner)
            .bind(&migration.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| schema_error("Failed to read schema ledger".into(), e))?;

            if already > 0 {
                continue;
            }

            let conn: &mut PgConnection = &mut tx;
            conn.execute(sqlx::raw_sql(&migration.sql))
                .await
                .map_err(|e| {
                    schema_error(
                        format!("Migration '{}' of '{owner}' failed: {e}", migration.name),
                        e,
                    )
                })?;

            sqlx::query("INSERT INTO extension_schema_migrations (owner, name) VALUES ($1, $2)")
                .bind(owner)
                .bind(&migration.name)
                .execute(&mut *tx)
                .await
                .map_err(|e| schema_error("Failed to record schema migration".into(), e))?;

            tx.commit()
                .await
                .map_err(|e| schema_error("Failed to commit schema migration".into(), e))?;

            info!(owner = %owner, migration = %migration.name, "Applied extension migration");
            applied += 1;
        }

        Ok(applied)
    }
}
