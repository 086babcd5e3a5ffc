//! In-process page store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A content page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// URL slug, unique within the store.
    pub slug: String,
    /// Title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

/// Pages keyed by slug. Each module instance owns its own store.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
    pages: Arc<RwLock<BTreeMap<String, Page>>>,
}

impl PageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a page. Returns `true` if it was new.
    pub async fn put(&self, page: Page) -> bool {
        self.pages
            .write()
            .await
            .insert(page.slug.clone(), page)
            .is_none()
    }

    /// Fetches a page by slug.
    pub async fn get(&self, slug: &str) -> Option<Page> {
        self.pages.read().await.get(slug).cloned()
    }

    /// Lists pages ordered by slug.
    pub async fn list(&self) -> Vec<Page> {
        self.pages.read().await.values().cloned().collect()
    }

    /// Number of stored pages.
    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.is_empty()
    }
}
