//! In-memory schema migrator.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_entity::extension::SchemaMigration;

use crate::store::SchemaMigrator;

/// Records applied migrations without executing SQL.
///
/// A migration with blank SQL is treated as a failing statement.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaMigrator {
    applied: Arc<Mutex<HashSet<(String, String)>>>,
}

impl MemorySchemaMigrator {
    /// Create an empty migrator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return whether `owner` has applied the named migration.
    pub async fn is_applied(&self, owner: &str, name: &str) -> bool {
        self.applied
            .lock()
            .await
            .contains(&(owner.to_string(), name.to_string()))
    }

    /// Return the number of applied migrations across all owners.
    pub async fn applied_count(&self) -> usize {
        self.applied.lock().await.len()
    }
}

#[async_trait]
impl SchemaMigrator for MemorySchemaMigrator {
    async fn apply(&self, owner: &str, migrations: &[SchemaMigration]) -> AppResult<usize> {
        let mut applied = self.applied.lock().await;
        let mut count = 0;
        for migration in migrations {
            let key = (owner.to_string(), migration.name.clone());
            if applied.contains(&key) {
                continue;
            }
            if migration.sql.trim().is_empty() {
                return Err(AppError::schema(format!(
                    "Migration '{}' of '{owner}' has no statements",
                    migration.name
                )));
            }
            applied.insert(key);
            count += 1;
        }
        Ok(count)
    }
}
