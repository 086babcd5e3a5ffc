//! The interface every extension module implements.

use async_trait::async_trait;
use axum::Router;

use extensa_core::result::AppResult;
use extensa_entity::extension::SchemaMigration;

use crate::api::context::ModuleContext;

/// A router an extension contributes, mounted under the extension's base
/// path plus `path`.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    /// Path below the extension's base, `""` for the base itself.
    pub path: String,
    /// The router serving the group.
    pub router: Router,
}

impl RouteGroup {
    /// A group mounted at the extension's base path.
    pub fn root(router: Router) -> Self {
        Self::nested("", router)
    }

    /// A group mounted at `path` below the extension's base path.
    pub fn nested(path: impl Into<String>, router: Router) -> Self {
        Self {
            path: path.into(),
            router,
        }
    }

    /// Return the absolute mount prefix for this group under `base`.
    pub fn mount_prefix(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Capability hooks of a loaded extension.
///
/// Every hook is invoked behind a panic boundary; a panic or error is
/// reported as `LOAD_ERROR` (routes, enable) or `SCHEMA_ERROR` (schema).
#[async_trait]
pub trait ExtensionModule: Send + Sync + std::fmt::Debug {
    /// Migrations to apply before any route is mounted, in addition to the
    /// package's `schema/*.sql` files.
    fn contribute_schema(&self) -> Vec<SchemaMigration> {
        Vec::new()
    }

    /// Routers to mount when the extension is enabled.
    fn contribute_routes(&self, _ctx: &ModuleContext) -> AppResult<Vec<RouteGroup>> {
        Ok(Vec::new())
    }

    /// Called after every route group is mounted.
    async fn on_enable(&self, _ctx: &ModuleContext) -> AppResult<()> {
        Ok(())
    }

    /// Called after the route groups are unmounted and the context's
    /// cancellation token has fired. Bounded by the operation timeout.
    async fn on_disable(&self, _ctx: &ModuleContext) -> AppResult<()> {
        Ok(())
    }
}
