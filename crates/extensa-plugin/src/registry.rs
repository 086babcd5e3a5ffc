//! Module registry: loaded module handles keyed by extension id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use extensa_core::types::ExtensionId;

use crate::handle::ModuleHandle;

/// Arena of loaded module handles.
///
/// Holds the handle of every live extension. Handles are evicted on
/// disable, so a later enable reloads the package from disk.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    handles: RwLock<HashMap<ExtensionId, Arc<ModuleHandle>>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a handle, replacing any previous one for the same id.
    pub async fn insert(&self, handle: ModuleHandle) -> Arc<ModuleHandle> {
        let handle = Arc::new(handle);
        let mut handles = self.handles.write().await;
        if handles
            .insert(handle.extension_id, Arc::clone(&handle))
            .is_some()
        {
            debug!(extension_id = %handle.extension_id, "Replaced cached module handle");
        }
        info!(extension_id = %handle.extension_id, key = %handle.key(), "Module handle registered");
        handle
    }

    /// Gets a handle by extension id.
    pub async fn get(&self, id: ExtensionId) -> Option<Arc<ModuleHandle>> {
        self.handles.read().await.get(&id).cloned()
    }

    /// Evicts a handle.
    pub async fn remove(&self, id: ExtensionId) -> Option<Arc<ModuleHandle>> {
        let removed = self.handles.write().await.remove(&id);
        if removed.is_some() {
            info!(extension_id = %id, "Module handle evicted");
        }
        removed
    }

    /// Checks whether a handle is cached.
    pub async fn contains(&self, id: ExtensionId) -> bool {
        self.handles.read().await.contains_key(&id)
    }

    /// Returns the number of cached handles.
    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    /// Returns whether no handle is cached.
    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }
}
