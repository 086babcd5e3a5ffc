//! In-memory permission store using a Tokio mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use extensa_core::result::AppResult;
use extensa_core::types::{PermissionId, UserId};
use extensa_entity::permission::{EntityRef, NewPermission, Permission};

use crate::store::PermissionStore;

type RowKey = (UserId, String, String);

/// Internal state for the memory permission store.
#[derive(Debug, Default)]
struct InnerState {
    /// Rows by id.
    rows: HashMap<PermissionId, Permission>,
    /// Uniqueness index over `(user, entity type, entity id)`.
    by_key: HashMap<RowKey, PermissionId>,
}

/// In-memory permission store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPermissionStore {
    state: Arc<Mutex<InnerState>>,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn key_of(user_id: UserId, entity: &EntityRef) -> RowKey {
    (user_id, entity.entity_type.clone(), entity.entity_id.clone())
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn find(&self, user_id: UserId, entity: &EntityRef) -> AppResult<Option<Permission>> {
        let state = self.state.lock().await;
        Ok(state
            .by_key
            .get(&key_of(user_id, entity))
            .and_then(|id| state.rows.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn upsert(&self, grant: &NewPermission) -> AppResult<Permission> {
        let mut state = self.state.lock().await;
        let key = key_of(grant.user_id, &grant.entity);
        let id = state
            .by_key
            .get(&key)
            .copied()
            .unwrap_or_else(PermissionId::new);

        let row = Permission {
            id,
            user_id: grant.user_id,
            entity_type: grant.entity.entity_type.clone(),
            entity_id: grant.entity.entity_id.clone(),
            permission_level: grant.level,
            granted_by: grant.granted_by,
            granted_at: Utc::now(),
            expires_at: grant.expires_at,
        };

        state.by_key.insert(key, id);
        state.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, id: PermissionId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.rows.remove(&id) {
            Some(row) => {
                state.by_key.remove(&key_of(row.user_id, &row.entity()));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_for_entity(&self, entity: &EntityRef) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Permission> = state
            .rows
            .values()
            .filter(|p| p.entity_type == entity.entity_type && p.entity_id == entity.entity_id)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.granted_at);
        Ok(rows)
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Permission> = state
            .rows
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.entity_type.as_str(), a.entity_id.as_str())
                .cmp(&(b.entity_type.as_str(), b.entity_id.as_str()))
        });
        Ok(rows)
    }

    async fn count_for_entity(&self, entity: &EntityRef) -> AppResult<u64> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .filter(|p| p.entity_type == entity.entity_type && p.entity_id == entity.entity_id)
            .count() as u64)
    }

    async fn delete_for_entity(&self, entity: &EntityRef) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let doomed: Vec<PermissionId> = state
            .rows
            .values()
            .filter(|p| p.entity_type == entity.entity_type && p.entity_id == entity.entity_id)
            .map(|p| p.id)
            .collect();
        for id in &doomed {
            if let Some(row) = state.rows.remove(id) {
                state.by_key.remove(&key_of(row.user_id, &row.entity()));
            }
        }
        Ok(doomed.len() as u64)
    }
}
