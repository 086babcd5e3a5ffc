//! The pages extension module.

use async_trait::async_trait;
use tracing::info;

use extensa_core::result::AppResult;
use extensa_entity::extension::SchemaMigration;
use extensa_plugin::{ExtensionModule, ModuleContext, RouteGroup};

use crate::handlers;
use crate::store::PageStore;

const PAGE_TABLE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS ext_pages_page (
    slug        VARCHAR(100) PRIMARY KEY,
    title       VARCHAR(200) NOT NULL,
    body        TEXT NOT NULL DEFAULT '',
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);";

/// Serves content pages from an in-process store.
#[derive(Debug, Default)]
pub struct PagesModule {
    store: PageStore,
}

impl PagesModule {
    /// Creates a module with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the module's page store.
    pub fn store(&self) -> &PageStore {
        &self.store
    }
}

#[async_trait]
impl ExtensionModule for PagesModule {
    fn contribute_schema(&self) -> Vec<SchemaMigration> {
        vec![SchemaMigration::new("pages_001_page_table", PAGE_TABLE_SQL)]
    }

    fn contribute_routes(&self, _ctx: &ModuleContext) -> AppResult<Vec<RouteGroup>> {
        Ok(vec![RouteGroup::root(handlers::router(self.store.clone()))])
    }

    async fn on_enable(&self, ctx: &ModuleContext) -> AppResult<()> {
        let pages = self.store.len().await;
        info!(
            extension = %ctx.key,
            base = %ctx.mount_base,
            pages = pages,
            "Pages extension enabled"
        );
        Ok(())
    }

    async fn on_disable(&self, ctx: &ModuleContext) -> AppResult<()> {
        info!(extension = %ctx.key, "Pages extension disabled");
        Ok(())
    }
}
