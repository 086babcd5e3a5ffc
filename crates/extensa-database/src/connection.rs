//! PostgreSQL connection pool management.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use extensa_core::config::DatabaseConfig;
use extensa_core::error::{AppError, ErrorKind};

use crate::repositories::{ExtensionRepository, PermissionRepository, PgSchemaMigrator};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    /// The underlying sqlx connection pool.
    pool: PgPool,
}

/// The PostgreSQL-backed stores, ready to be injected as trait objects.
#[derive(Debug, Clone)]
pub struct PgStores {
    /// Permission rows.
    pub permissions: Arc<PermissionRepository>,
    /// Extension registry rows.
    pub extensions: Arc<ExtensionRepository>,
    /// Extension schema migrator.
    pub migrator: Arc<PgSchemaMigrator>,
}

impl DatabasePool {
    /// Create a new database pool from configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the host migrations (extensions, permissions, schema ledger).
    pub async fn migrate(&self) -> Result<(), AppError> {
        crate::migration::run_migrations(&self.pool).await
    }

    /// Build the PostgreSQL stores sharing this pool.
    pub fn stores(&self) -> PgStores {
        PgStores {
            permissions: Arc::new(PermissionRepository::new(self.pool.clone())),
            extensions: Arc::new(ExtensionRepository::new(self.pool.clone())),
            migrator: Arc::new(PgSchemaMigrator::new(self.pool.clone())),
        }
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url.rfind('@') {
        Some(at_pos) if at_pos > scheme_end => match url[scheme_end..at_pos].find(':') {
            Some(rel) => {
                let colon_pos = scheme_end + rel;
                format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..])
            }
            None => url.to_string(),
        },
        _ => url.to_string(),
    }
}
