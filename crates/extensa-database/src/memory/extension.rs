//! In-memory extension registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::Mutex;

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;
use extensa_entity::extension::{Extension, ExtensionStatus, NewExtension};

use crate::store::ExtensionStore;

#[derive(Debug, Default)]
struct InnerState {
    /// Last issued id.
    last_id: i64,
    /// Rows by id.
    rows: BTreeMap<ExtensionId, Extension>,
}

/// In-memory extension registry with generated ids and a
/// `(name, version)` uniqueness check.
#[derive(Debug, Clone, Default)]
pub struct MemoryExtensionStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryExtensionStore {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExtensionStore for MemoryExtensionStore {
    async fn insert(&self, new: &NewExtension) -> AppResult<Extension> {
        let mut state = self.state.lock().await;
        let manifest = &new.manifest;

        if state
            .rows
            .values()
            .any(|e| e.name == manifest.name && e.version == manifest.version)
        {
            return Err(AppError::conflict(format!(
                "Extension '{}' is already installed",
                new.key()
            )));
        }

        state.last_id += 1;
        let id = ExtensionId(state.last_id);
        let now = Utc::now();
        let row = Extension {
            id,
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            status: new.status,
            is_enabled: false,
            extension_type: manifest.extension_type,
            file_path: new.file_path.clone(),
            manifest: Json(manifest.clone()),
            created_at: now,
            updated_at: now,
        };
        state.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: ExtensionId) -> AppResult<Option<Extension>> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_key(&self, name: &str, version: &str) -> AppResult<Option<Extension>> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .values()
            .find(|e| e.name == name && e.version == version)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Extension>> {
        Ok(self
            .state
            .lock()
            .await
            .rows
            .values()
            .filter(|e| e.name == name)
            .cloned()
            .collect())
    }

    async fn list(&self) -> AppResult<Vec<Extension>> {
        Ok(self.state.lock().await.rows.values().cloned().collect())
    }

    async fn update_state(
        &self,
        id: ExtensionId,
        status: ExtensionStatus,
        is_enabled: bool,
    ) -> AppResult<Extension> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))?;
        row.status = status;
        row.is_enabled = is_enabled;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn replace(&self, id: ExtensionId, new: &NewExtension) -> AppResult<Extension> {
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Extension {id} not found")))?;
        row.status = new.status;
        row.is_enabled = false;
        row.extension_type = new.manifest.extension_type;
        row.file_path = new.file_path.clone();
        row.manifest = Json(new.manifest.clone());
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, id: ExtensionId) -> AppResult<bool> {
        Ok(self.state.lock().await.rows.remove(&id).is_some())
    }
}
