//! Lifecycle coordinator: the extension state machine.
//!
//! Keeps the durable registry rows and the process-local runtime contexts
//! consistent:
//!
//! ```text
//! uploaded ──▶ installed ──▶ active ⇄ installed
//!     │            │            │
//!     └────────────┴────────────┴──▶ broken ──(disable)──▶ installed
//! ```
//!
//! Enable and disable of one extension are serialized by a per-id lock;
//! installs of one `name_version` key by a per-key lock. Slow phases
//! (unpacking, schema, module load, hooks) are bounded by the configured
//! operation timeout.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use extensa_auth::{AuditSink, PermissionEngine};
use extensa_core::AppError;
use extensa_core::config::ExtensionConfig;
use extensa_core::error::ErrorKind;
use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;
use extensa_database::store::ExtensionStore;
use extensa_entity::audit::{AuditAction, AuditEvent};
use extensa_entity::extension::{Extension, ExtensionRef, ExtensionStatus, NewExtension};
use extensa_entity::permission::{EXTENSION_ENTITY, EntityRef, PermissionLevel};
use extensa_entity::user::Principal;

use crate::api::context::ModuleContext;
use crate::context::ExtensionContext;
use crate::guard::{guard_async, guard_sync, rekind};
use crate::loader::ExtensionLoader;
use crate::package::{ExtractLimits, PackageLayout, extract_archive};
use crate::registry::ModuleRegistry;
use crate::routes::RouteTable;

/// Result of a lifecycle transition.
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleOutcome {
    /// The extension record after the transition.
    pub extension: Extension,
    /// `false` when the extension was already in the requested state.
    pub changed: bool,
}

impl LifecycleOutcome {
    fn changed(extension: Extension) -> Self {
        Self {
            extension,
            changed: true,
        }
    }

    fn unchanged(extension: Extension) -> Self {
        Self {
            extension,
            changed: false,
        }
    }
}

/// Summary of startup reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Extensions re-enabled.
    pub enabled: usize,
    /// Extensions whose re-enable failed (now broken).
    pub failed: usize,
    /// Rows left in `uploaded` by an interrupted install, now broken.
    pub marked_broken: usize,
}

/// Owns every extension's runtime context and drives its transitions.
#[derive(Debug)]
pub struct LifecycleCoordinator {
    config: ExtensionConfig,
    extensions: Arc<dyn ExtensionStore>,
    engine: Arc<PermissionEngine>,
    loader: ExtensionLoader,
    modules: ModuleRegistry,
    routes: Arc<RouteTable>,
    contexts: RwLock<HashMap<ExtensionId, ExtensionContext>>,
    locks: DashMap<ExtensionId, Arc<Mutex<()>>>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    audit: Arc<dyn AuditSink>,
}

impl LifecycleCoordinator {
    /// Creates a coordinator with an empty route table.
    pub fn new(
        config: ExtensionConfig,
        extensions: Arc<dyn ExtensionStore>,
        engine: Arc<PermissionEngine>,
        loader: ExtensionLoader,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config,
            extensions,
            engine,
            loader,
            modules: ModuleRegistry::new(),
            routes: Arc::new(RouteTable::new()),
            contexts: RwLock::new(HashMap::new()),
            locks: DashMap::new(),
            key_locks: DashMap::new(),
            audit,
        }
    }

    /// Returns the route table extension routes are mounted on.
    pub fn routes(&self) -> Arc<RouteTable> {
        Arc::clone(&self.routes)
    }

    /// Returns the permission engine.
    pub fn engine(&self) -> &Arc<PermissionEngine> {
        &self.engine
    }

    /// Returns the extension configuration.
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Returns whether an extension has a live runtime context.
    pub async fn is_live(&self, id: ExtensionId) -> bool {
        self.contexts.read().await.contains_key(&id)
    }

    /// Returns the number of live runtime contexts.
    pub async fn live_count(&self) -> usize {
        self.contexts.read().await.len()
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Lists every installed extension. Requires type-wide `view`.
    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<Extension>> {
        self.authorize(principal, PermissionLevel::View).await?;
        self.extensions.list().await
    }

    /// Gets one extension. Requires type-wide `view`.
    pub async fn get(&self, principal: &Principal, reference: &ExtensionRef) -> AppResult<Extension> {
        self.authorize(principal, PermissionLevel::View).await?;
        self.find(reference).await
    }

    // ── Install ──────────────────────────────────────────────────────

    /// Installs a package archive. Requires a global admin.
    ///
    /// The new row lands as `installed` and disabled. With `overwrite`, an
    /// existing installation of the same key is replaced in place and keeps
    /// its id.
    pub async fn install(
        &self,
        principal: &Principal,
        archive: Vec<u8>,
        overwrite: bool,
    ) -> AppResult<LifecycleOutcome> {
        if !principal.is_global_admin() {
            return Err(AppError::forbidden(format!(
                "'{}' must be a global admin to install extensions",
                principal.username
            )));
        }
        if archive.len() as u64 > self.config.max_package_bytes {
            return Err(AppError::invalid_package(format!(
                "Package is {} bytes; the limit is {}",
                archive.len(),
                self.config.max_package_bytes
            )));
        }

        let staging = self.config.staging_dir().join(Uuid::new_v4().to_string());
        let layout = match self
            .bounded("package", "validation", self.stage(archive, &staging))
            .await
        {
            Ok(layout) => layout,
            Err(e) => {
                remove_dir_quietly(&staging).await;
                warn!(error = %e, "Package rejected");
                return Err(e);
            }
        };

        let key = layout.key();
        let key_lock = self.key_locks.entry(key.clone()).or_default().clone();
        let result = {
            let _key_guard = key_lock.lock().await;
            self.install_keyed(principal, &layout, overwrite).await
        };
        drop(key_lock);
        self.key_locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        remove_dir_quietly(&staging).await;
        result
    }

    async fn install_keyed(
        &self,
        principal: &Principal,
        layout: &PackageLayout,
        overwrite: bool,
    ) -> AppResult<LifecycleOutcome> {
        let existing = self
            .extensions
            .find_by_key(&layout.manifest.name, &layout.manifest.version)
            .await?;
        match existing {
            Some(existing) if !overwrite => Err(AppError::conflict(format!(
                "Extension '{}' is already installed (id {})",
                layout.key(),
                existing.id
            ))),
            Some(existing) => self.install_over(principal, existing, layout).await,
            None => self.install_fresh(principal, layout).await,
        }
    }

    async fn stage(&self, archive: Vec<u8>, staging: &Path) -> AppResult<PackageLayout> {
        let limits = ExtractLimits::with_max_bytes(self.config.max_package_bytes);
        let dest = staging.to_path_buf();
        let root = tokio::task::spawn_blocking(move || -> AppResult<PathBuf> {
            std::fs::create_dir_all(&dest)?;
            extract_archive(&archive, &dest, limits)
        })
        .await
        .map_err(|e| AppError::internal(format!("Package extraction task failed: {e}")))??;

        self.loader.inspect(&root).await
    }

    async fn install_fresh(
        &self,
        principal: &Principal,
        layout: &PackageLayout,
    ) -> AppResult<LifecycleOutcome> {
        let key = layout.key();
        let final_dir = self.config.root().join(&key);
        let row = self
            .extensions
            .insert(&NewExtension::uploaded(
                layout.manifest.clone(),
                final_dir.to_string_lossy().into_owned(),
            ))
            .await?;

        let mut moved = false;
        let result: AppResult<Extension> = async {
            if layout.manifest.eager_schema {
                self.bounded(&key, "schema", self.loader.load(&layout.root, row.id))
                    .await?;
            }
            remove_dir_quietly(&final_dir).await;
            tokio::fs::rename(&layout.root, &final_dir).await?;
            moved = true;
            self.extensions
                .update_state(row.id, ExtensionStatus::Installed, false)
                .await
        }
        .await;

        match result {
            Ok(installed) => {
                info!(extension_id = %installed.id, key = %key, "Extension installed");
                self.record(
                    AuditAction::ExtensionInstalled,
                    principal,
                    &installed,
                    json!({ "overwrite": false }),
                );
                Ok(LifecycleOutcome::changed(installed))
            }
            Err(e) => {
                error!(key = %key, error = %e, "Extension install failed");
                if moved {
                    remove_dir_quietly(&final_dir).await;
                }
                if let Err(cleanup) = self.extensions.delete(row.id).await {
                    warn!(extension_id = %row.id, error = %cleanup, "Failed to remove row of failed install");
                }
                Err(e)
            }
        }
    }

    async fn install_over(
        &self,
        principal: &Principal,
        existing: Extension,
        layout: &PackageLayout,
    ) -> AppResult<LifecycleOutcome> {
        let key = layout.key();
        let lock = self.lock_for(existing.id);
        let _guard = lock.lock().await;

        let existing = self.settle(existing).await?;
        if self.teardown(principal, &existing).await? {
            info!(extension_id = %existing.id, key = %key, "Disabled live extension before overwrite");
        }

        if layout.manifest.eager_schema {
            self.bounded(&key, "schema", self.loader.load(&layout.root, existing.id))
                .await?;
        }

        let final_dir = self.config.root().join(&key);
        remove_dir_quietly(Path::new(&existing.file_path)).await;
        remove_dir_quietly(&final_dir).await;
        tokio::fs::rename(&layout.root, &final_dir).await?;

        let mut replacement = NewExtension::uploaded(
            layout.manifest.clone(),
            final_dir.to_string_lossy().into_owned(),
        );
        replacement.status = ExtensionStatus::Installed;
        let installed = self.extensions.replace(existing.id, &replacement).await?;

        info!(extension_id = %installed.id, key = %key, "Extension reinstalled over existing package");
        self.record(
            AuditAction::ExtensionInstalled,
            principal,
            &installed,
            json!({ "overwrite": true }),
        );
        Ok(LifecycleOutcome::changed(installed))
    }

    // ── Enable / Disable ─────────────────────────────────────────────

    /// Enables an extension: loads it, mounts its route groups, runs its
    /// enable hook and persists `active`.
    ///
    /// A no-op if the extension already has a live context. Any failure
    /// unmounts everything the extension owns and marks it `broken`.
    pub async fn enable(
        &self,
        principal: &Principal,
        reference: &ExtensionRef,
    ) -> AppResult<LifecycleOutcome> {
        self.authorize(principal, PermissionLevel::Admin).await?;
        let row = self.find(reference).await?;

        let lock = self.lock_for(row.id);
        let _guard = lock.lock().await;
        let row = self.reload(row.id).await?;
        self.enable_locked(principal, row).await
    }

    async fn enable_locked(&self, principal: &Principal, row: Extension) -> AppResult<LifecycleOutcome> {
        let key = row.key();

        if self.is_live(row.id).await {
            debug!(extension_id = %row.id, key = %key, "Extension already enabled");
            if row.is_serving() {
                return Ok(LifecycleOutcome::unchanged(row));
            }
            let row = self
                .extensions
                .update_state(row.id, ExtensionStatus::Active, true)
                .await?;
            return Ok(LifecycleOutcome::unchanged(row));
        }

        match row.status {
            ExtensionStatus::Broken => {
                return Err(AppError::broken(format!(
                    "Extension '{key}' is broken; disable it before enabling again"
                )));
            }
            ExtensionStatus::Uploaded => {
                return Err(AppError::conflict(format!(
                    "Extension '{key}' is still being installed"
                )));
            }
            _ => {}
        }

        let module_ctx = ModuleContext::new(row.id, key.clone(), row.manifest.mount_base());
        let activated = self
            .bounded(&key, "enable", self.activate(&row, &module_ctx))
            .await;

        let ctx = match activated {
            Ok(ctx) => ctx,
            Err(e) => return Err(self.mark_broken(principal, &row, &module_ctx, e).await),
        };

        let prefixes = ctx.mounted.clone();
        self.contexts.write().await.insert(row.id, ctx);

        let row = match self
            .extensions
            .update_state(row.id, ExtensionStatus::Active, true)
            .await
        {
            Ok(row) => row,
            Err(e) => {
                if let Err(hook) = self.teardown(principal, &row).await {
                    warn!(extension_id = %row.id, error = %hook, "Teardown after failed enable did not finish");
                }
                return Err(e);
            }
        };

        info!(extension_id = %row.id, key = %key, routes = ?prefixes, "Extension enabled");
        self.record(
            AuditAction::ExtensionEnabled,
            principal,
            &row,
            json!({ "routes": prefixes }),
        );
        Ok(LifecycleOutcome::changed(row))
    }

    async fn activate(&self, row: &Extension, module_ctx: &ModuleContext) -> AppResult<ExtensionContext> {
        let key = row.key();
        let handle = match self.modules.get(row.id).await {
            Some(handle) => handle,
            None => {
                let handle = self.loader.load(Path::new(&row.file_path), row.id).await?;
                self.modules.insert(handle).await
            }
        };

        let stale = self.routes.unmount_owner(row.id).await;
        if !stale.is_empty() {
            warn!(extension_id = %row.id, prefixes = ?stale, "Cleared mounts left by an interrupted teardown");
        }

        let mut mounted = Vec::new();
        if let Some(module) = handle.module() {
            let groups = guard_sync(&key, "contribute_routes", ErrorKind::LoadError, || {
                module.contribute_routes(module_ctx)
            })?
            .map_err(|e| rekind(&key, "contribute_routes", ErrorKind::LoadError, e))?;

            for group in groups {
                let prefix = group.mount_prefix(&module_ctx.mount_base);
                self.routes.mount(row.id, &prefix, group.router).await?;
                mounted.push(prefix);
            }

            guard_async(&key, "on_enable", ErrorKind::LoadError, module.on_enable(module_ctx)).await?;
        }

        Ok(ExtensionContext::new(handle, mounted, module_ctx.clone()))
    }

    async fn mark_broken(
        &self,
        principal: &Principal,
        row: &Extension,
        module_ctx: &ModuleContext,
        cause: AppError,
    ) -> AppError {
        let unmounted = self.routes.unmount_owner(row.id).await;
        self.modules.remove(row.id).await;
        module_ctx.shutdown();

        error!(
            extension_id = %row.id,
            key = %row.key(),
            error = %cause,
            unmounted = unmounted.len(),
            "Extension activation failed; marked broken"
        );
        self.persist_broken(principal, row, cause).await
    }

    async fn persist_broken(&self, principal: &Principal, row: &Extension, cause: AppError) -> AppError {
        if let Err(e) = self
            .extensions
            .update_state(row.id, ExtensionStatus::Broken, false)
            .await
        {
            warn!(extension_id = %row.id, error = %e, "Failed to persist broken state");
        }
        self.record(
            AuditAction::ExtensionBroken,
            principal,
            row,
            json!({ "code": cause.kind.code(), "message": cause.message.as_str() }),
        );
        cause
    }

    /// Disables an extension: persists `installed`, releases its context and
    /// routes, then runs its disable hook under the operation timeout.
    ///
    /// A no-op if the extension is already disabled. Clears `broken`. A hook
    /// that times out leaves the extension `broken`.
    pub async fn disable(
        &self,
        principal: &Principal,
        reference: &ExtensionRef,
    ) -> AppResult<LifecycleOutcome> {
        self.authorize(principal, PermissionLevel::Admin).await?;
        let row = self.find(reference).await?;

        let lock = self.lock_for(row.id);
        let _guard = lock.lock().await;
        let row = self.reload(row.id).await?;
        self.disable_locked(principal, row).await
    }

    async fn disable_locked(&self, principal: &Principal, row: Extension) -> AppResult<LifecycleOutcome> {
        if row.status == ExtensionStatus::Uploaded {
            return Err(AppError::conflict(format!(
                "Extension '{}' is still being installed",
                row.key()
            )));
        }

        let settled = is_settled(&row);
        let row = self.settle(row).await?;
        let was_live = self.teardown(principal, &row).await?;
        if settled && !was_live {
            debug!(extension_id = %row.id, "Extension already disabled");
            return Ok(LifecycleOutcome::unchanged(row));
        }

        info!(extension_id = %row.id, key = %row.key(), "Extension disabled");
        self.record(
            AuditAction::ExtensionDisabled,
            principal,
            &row,
            json!({ "was_live": was_live }),
        );
        Ok(LifecycleOutcome::changed(row))
    }

    /// Persists `installed` / disabled unless the row already says so.
    async fn settle(&self, row: Extension) -> AppResult<Extension> {
        if is_settled(&row) {
            return Ok(row);
        }
        self.extensions
            .update_state(row.id, ExtensionStatus::Installed, false)
            .await
    }

    /// Tears down a live context. Returns whether one existed.
    ///
    /// The context is dropped, its routes unmounted and its token cancelled
    /// before the disable hook is awaited. A hook that overruns the operation
    /// timeout marks the extension `broken` and fails with `TIMEOUT`; any
    /// other hook failure is logged.
    async fn teardown(&self, principal: &Principal, row: &Extension) -> AppResult<bool> {
        let Some(ctx) = self.release(row.id).await else {
            return Ok(false);
        };
        match self.run_disable_hook(&ctx).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind == ErrorKind::Timeout => {
                error!(extension_id = %row.id, key = %ctx.key, error = %e, "Disable hook timed out; marked broken");
                Err(self.persist_broken(principal, row, e).await)
            }
            Err(e) => {
                warn!(extension_id = %row.id, error = %e, "Disable hook failed; continuing teardown");
                Ok(true)
            }
        }
    }

    /// Drops the live context of `id`, unmounts its routes, evicts its
    /// module and cancels its token. Nothing here awaits extension code.
    async fn release(&self, id: ExtensionId) -> Option<ExtensionContext> {
        let ctx = self.contexts.write().await.remove(&id);
        let unmounted = self.routes.unmount_owner(id).await;
        self.modules.remove(id).await;
        let ctx = ctx?;
        ctx.module_ctx.shutdown();
        debug!(extension_id = %id, key = %ctx.key, unmounted = unmounted.len(), "Extension context released");
        Some(ctx)
    }

    async fn run_disable_hook(&self, ctx: &ExtensionContext) -> AppResult<()> {
        let Some(module) = ctx.handle.module() else {
            return Ok(());
        };
        let hook = guard_async(
            &ctx.key,
            "on_disable",
            ErrorKind::LoadError,
            module.on_disable(&ctx.module_ctx),
        );
        self.bounded(&ctx.key, "disable", hook).await
    }

    // ── Uninstall ────────────────────────────────────────────────────

    /// Uninstalls an extension, disabling it first.
    ///
    /// Permission rows on the extension are deleted with `cascade`;
    /// otherwise their presence is a `CONFLICT`. The extension's own tables
    /// are left in place.
    pub async fn uninstall(
        &self,
        principal: &Principal,
        reference: &ExtensionRef,
        cascade: bool,
    ) -> AppResult<LifecycleOutcome> {
        self.authorize(principal, PermissionLevel::Admin).await?;
        let row = self.find(reference).await?;

        let lock = self.lock_for(row.id);
        let _guard = lock.lock().await;
        let row = self.reload(row.id).await?;
        let key = row.key();

        let entity = EntityRef::extension(row.id);
        let grants = self.engine.count_for_entity(&entity).await?;
        if grants > 0 && !cascade {
            return Err(AppError::conflict(format!(
                "Extension '{key}' has {grants} permission(s); uninstall with cascade to remove them"
            )));
        }

        let row = self.settle(row).await?;
        if self.teardown(principal, &row).await? {
            info!(extension_id = %row.id, key = %key, "Disabled extension before uninstall");
        }
        let purged = if cascade {
            self.engine.purge_entity(principal, &entity).await?
        } else {
            0
        };

        self.extensions.delete(row.id).await?;
        remove_dir_quietly(Path::new(&row.file_path)).await;
        self.locks.remove(&row.id);

        info!(extension_id = %row.id, key = %key, purged, "Extension uninstalled");
        self.record(
            AuditAction::ExtensionUninstalled,
            principal,
            &row,
            json!({ "cascade": cascade, "permissions_removed": purged }),
        );
        Ok(LifecycleOutcome::changed(row))
    }

    // ── Startup / Shutdown ───────────────────────────────────────────

    /// Reconciles runtime state with the registry after a restart.
    ///
    /// Rows left in `uploaded` become `broken`; every row whose durable flag
    /// is set is enabled again. Failures are logged and counted, never
    /// returned.
    pub async fn restore(&self) -> AppResult<RestoreReport> {
        remove_dir_quietly(&self.config.staging_dir()).await;

        let system = Principal::system();
        let mut report = RestoreReport::default();

        for row in self.extensions.list().await? {
            if row.status == ExtensionStatus::Uploaded {
                warn!(extension_id = %row.id, key = %row.key(), "Interrupted install found; marking broken");
                self.extensions
                    .update_state(row.id, ExtensionStatus::Broken, false)
                    .await?;
                report.marked_broken += 1;
                continue;
            }
            if !row.is_enabled || row.is_broken() {
                continue;
            }

            let lock = self.lock_for(row.id);
            let _guard = lock.lock().await;
            let id = row.id;
            let key = row.key();
            match self.enable_locked(&system, row).await {
                Ok(_) => report.enabled += 1,
                Err(e) => {
                    error!(extension_id = %id, key = %key, error = %e, "Failed to restore extension");
                    report.failed += 1;
                }
            }
        }

        info!(
            enabled = report.enabled,
            failed = report.failed,
            marked_broken = report.marked_broken,
            "Extension restore complete"
        );
        Ok(report)
    }

    /// Releases every live context without touching durable state, so the
    /// next start restores the same set.
    pub async fn shutdown(&self) {
        let ids: Vec<ExtensionId> = self.contexts.read().await.keys().copied().collect();
        let mut released = 0;
        for id in ids {
            let lock = self.lock_for(id);
            let _guard = lock.lock().await;
            let Some(ctx) = self.release(id).await else {
                continue;
            };
            released += 1;
            if let Err(e) = self.run_disable_hook(&ctx).await {
                warn!(extension_id = %id, error = %e, "Disable hook failed during shutdown");
            }
        }
        info!(count = released, "Extension contexts shut down");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn authorize(&self, principal: &Principal, level: PermissionLevel) -> AppResult<()> {
        if self
            .engine
            .has_extension_type_permission(principal, level)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "'{}' requires '{level}' on every {EXTENSION_ENTITY}",
                principal.username
            )))
        }
    }

    async fn find(&self, reference: &ExtensionRef) -> AppResult<Extension> {
        self.extensions
            .resolve(reference)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Extension '{reference}' not found")))
    }

    async fn reload(&self, id: ExtensionId) -> AppResult<Extension> {
        self.find(&ExtensionRef::Id(id)).await
    }

    fn lock_for(&self, id: ExtensionId) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().clone()
    }

    async fn bounded<T>(
        &self,
        key: &str,
        phase: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let limit = self.config.operation_timeout();
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::timeout(format!(
                "Extension '{key}' {phase} did not finish within {}s",
                limit.as_secs()
            ))),
        }
    }

    fn record(
        &self,
        action: AuditAction,
        principal: &Principal,
        row: &Extension,
        mut details: serde_json::Value,
    ) {
        if let Some(map) = details.as_object_mut() {
            map.insert("key".to_string(), json!(row.key()));
        }
        self.audit.record(AuditEvent::new(
            action,
            principal.user_id,
            EXTENSION_ENTITY,
            row.entity_id(),
            details,
        ));
    }
}

/// Whether a row already records a disabled, installed extension.
fn is_settled(row: &Extension) -> bool {
    !row.is_enabled && matches!(row.status, ExtensionStatus::Installed | ExtensionStatus::Disabled)
}

async fn remove_dir_quietly(path: &Path) {
    let path: PathBuf = path.to_path_buf();
    match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => debug!(path = %path.display(), "Removed directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::Router;
    use axum::routing::get;

    use extensa_auth::MemoryAuditSink;
    use extensa_core::types::UserId;
    use extensa_database::memory::{
        MemoryExtensionStore, MemoryPermissionStore, MemorySchemaMigrator,
    };

    use crate::module::{ExtensionModule, RouteGroup};
    use crate::package::PackageBuilder;
    use crate::source::BuiltinModules;

    #[derive(Debug, Default)]
    struct Hello {
        fail_enable: bool,
        slow_enable: bool,
        hang_disable: bool,
    }

    #[async_trait]
    impl ExtensionModule for Hello {
        fn contribute_routes(&self, _ctx: &ModuleContext) -> AppResult<Vec<RouteGroup>> {
            Ok(vec![
                RouteGroup::root(Router::new().route("/", get(|| async { "hello" }))),
                RouteGroup::nested("admin", Router::new().route("/", get(|| async { "admin" }))),
            ])
        }

        async fn on_enable(&self, _ctx: &ModuleContext) -> AppResult<()> {
            if self.slow_enable {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.fail_enable {
                return Err(AppError::internal("refused to start"));
            }
            Ok(())
        }

        async fn on_disable(&self, _ctx: &ModuleContext) -> AppResult<()> {
            if self.hang_disable {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }
    }

    /// Registry whose rows can never be deleted.
    #[derive(Debug)]
    struct UndeletableStore(MemoryExtensionStore);

    #[async_trait]
    impl ExtensionStore for UndeletableStore {
        async fn insert(&self, new: &NewExtension) -> AppResult<Extension> {
            self.0.insert(new).await
        }

        async fn find_by_id(&self, id: ExtensionId) -> AppResult<Option<Extension>> {
            self.0.find_by_id(id).await
        }

        async fn find_by_key(&self, name: &str, version: &str) -> AppResult<Option<Extension>> {
            self.0.find_by_key(name, version).await
        }

        async fn find_by_name(&self, name: &str) -> AppResult<Vec<Extension>> {
            self.0.find_by_name(name).await
        }

        async fn list(&self) -> AppResult<Vec<Extension>> {
            self.0.list().await
        }

        async fn update_state(
            &self,
            id: ExtensionId,
            status: ExtensionStatus,
            is_enabled: bool,
        ) -> AppResult<Extension> {
            self.0.update_state(id, status, is_enabled).await
        }

        async fn replace(&self, id: ExtensionId, new: &NewExtension) -> AppResult<Extension> {
            self.0.replace(id, new).await
        }

        async fn delete(&self, _id: ExtensionId) -> AppResult<bool> {
            Err(AppError::internal("registry is read-only"))
        }
    }

    struct Fixture {
        root: tempfile::TempDir,
        extensions: MemoryExtensionStore,
        permissions: MemoryPermissionStore,
        migrator: MemorySchemaMigrator,
        audit: MemoryAuditSink,
        timeout_seconds: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_timeout(30)
        }

        fn with_timeout(timeout_seconds: u64) -> Self {
            Self {
                root: tempfile::tempdir().unwrap(),
                extensions: MemoryExtensionStore::new(),
                permissions: MemoryPermissionStore::new(),
                migrator: MemorySchemaMigrator::new(),
                audit: MemoryAuditSink::new(),
                timeout_seconds,
            }
        }

        fn coordinator(&self) -> LifecycleCoordinator {
            self.coordinator_with(Arc::new(self.extensions.clone()))
        }

        fn coordinator_with(&self, extensions: Arc<dyn ExtensionStore>) -> LifecycleCoordinator {
            let engine = Arc::new(PermissionEngine::new(
                Arc::new(self.permissions.clone()),
                Arc::clone(&extensions),
                Arc::new(self.audit.clone()),
            ));
            let builtins = BuiltinModules::new()
                .with("hello", || Arc::new(Hello::default()) as Arc<dyn ExtensionModule>)
                .with("failing", || {
                    Arc::new(Hello {
                        fail_enable: true,
                        ..Hello::default()
                    }) as Arc<dyn ExtensionModule>
                })
                .with("slow", || {
                    Arc::new(Hello {
                        slow_enable: true,
                        ..Hello::default()
                    }) as Arc<dyn ExtensionModule>
                })
                .with("hanging", || {
                    Arc::new(Hello {
                        hang_disable: true,
                        ..Hello::default()
                    }) as Arc<dyn ExtensionModule>
                });
            let loader = ExtensionLoader::new(builtins, Arc::new(self.migrator.clone()));
            let mut config = ExtensionConfig::with_root(self.root.path());
            config.operation_timeout_seconds = self.timeout_seconds;
            LifecycleCoordinator::new(
                config,
                extensions,
                engine,
                loader,
                Arc::new(self.audit.clone()),
            )
        }
    }

    fn package(name: &str, version: &str, entrypoint: &str) -> Vec<u8> {
        PackageBuilder::new()
            .manifest(format!(
                "name = \"{name}\"\nversion = \"{version}\"\ntype = \"generic\"\n\n[routes]\nentrypoint = \"{entrypoint}\"\n"
            ))
            .build()
            .unwrap()
    }

    fn eager_package(name: &str, sql: &str) -> Vec<u8> {
        PackageBuilder::new()
            .manifest(format!(
                "name = \"{name}\"\nversion = \"1.0.0\"\ntype = \"generic\"\neager_schema = true\n\n[routes]\nentrypoint = \"hello\"\n"
            ))
            .file("schema/001_init.sql", sql)
            .build()
            .unwrap()
    }

    fn admin() -> Principal {
        Principal::admin(UserId::new(), "admin1")
    }

    fn pages_ref() -> ExtensionRef {
        ExtensionRef::key("Pages", "1.0.0")
    }

    #[tokio::test]
    async fn test_install_enable_disable_cycle() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();

        let installed = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        assert_eq!(installed.extension.status, ExtensionStatus::Installed);
        assert!(!installed.extension.is_enabled);
        assert!(fixture.root.path().join("Pages_1.0.0").join("extension.toml").is_file());

        let enabled = coordinator.enable(&admin, &pages_ref()).await.unwrap();
        assert!(enabled.changed);
        assert_eq!(enabled.extension.status, ExtensionStatus::Active);
        assert!(enabled.extension.is_enabled);
        let routes = coordinator.routes();
        assert!(routes.resolve("/extensions/pages").await.is_some());
        assert!(routes.resolve("/extensions/pages/admin").await.is_some());

        let again = coordinator.enable(&admin, &pages_ref()).await.unwrap();
        assert!(!again.changed);
        assert_eq!(routes.len().await, 2);

        let disabled = coordinator.disable(&admin, &pages_ref()).await.unwrap();
        assert!(disabled.changed);
        assert_eq!(disabled.extension.status, ExtensionStatus::Installed);
        assert!(routes.is_empty().await);
        assert!(!coordinator.is_live(disabled.extension.id).await);

        let noop = coordinator.disable(&admin, &pages_ref()).await.unwrap();
        assert!(!noop.changed);

        let actions = fixture.audit.actions();
        assert!(actions.contains(&AuditAction::ExtensionInstalled));
        assert!(actions.contains(&AuditAction::ExtensionEnabled));
        assert!(actions.contains(&AuditAction::ExtensionDisabled));
    }

    #[tokio::test]
    async fn test_lifecycle_requires_authorization() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let bob = Principal::member(UserId::new(), "bob");

        let err = coordinator
            .install(&bob, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        coordinator
            .install(&admin(), package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        let err = coordinator.enable(&bob, &pages_ref()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let err = coordinator.list(&bob).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_type_wide_admin_may_enable() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();
        let operator = Principal::member(UserId::new(), "operator");

        coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        coordinator
            .engine()
            .grant(
                &admin,
                operator.user_id,
                EntityRef::type_wide(EXTENSION_ENTITY),
                PermissionLevel::Admin,
                None,
            )
            .await
            .unwrap();

        let outcome = coordinator.enable(&operator, &pages_ref()).await.unwrap();
        assert!(outcome.extension.is_serving());
    }

    #[tokio::test]
    async fn test_reinstall_conflicts_unless_overwrite() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();

        let first = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        coordinator.enable(&admin, &pages_ref()).await.unwrap();

        let err = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let second = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), true)
            .await
            .unwrap();
        assert_eq!(second.extension.id, first.extension.id);
        assert_eq!(second.extension.status, ExtensionStatus::Installed);
        assert!(!second.extension.is_enabled);
        assert!(coordinator.routes().is_empty().await);
        assert_eq!(fixture.extensions.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_package_leaves_nothing_behind() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let archive = PackageBuilder::new()
            .manifest("name = \"Pages\"\nversion = \"1.0.0\"\n\n[routes]\nentrypoint = \"hello\"\n")
            .build()
            .unwrap();

        let err = coordinator.install(&admin(), archive, false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPackage);
        assert!(fixture.extensions.list().await.unwrap().is_empty());
        assert!(coordinator.routes().is_empty().await);
        let staged = std::fs::read_dir(fixture.root.path().join(".staging"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(staged, 0);
    }

    #[tokio::test]
    async fn test_unknown_entrypoint_is_rejected_at_install() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let err = coordinator
            .install(&admin(), package("Ghost", "1.0.0", "ghost"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::LoadError);
        assert!(fixture.extensions.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_archive_is_rejected() {
        let fixture = Fixture::new();
        let mut coordinator = fixture.coordinator();
        coordinator.config.max_package_bytes = 16;
        let err = coordinator
            .install(&admin(), package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPackage);
    }

    #[tokio::test]
    async fn test_failed_enable_marks_broken_and_unmounts() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();
        let reference = ExtensionRef::key("Flaky", "1.0.0");

        coordinator
            .install(&admin, package("Flaky", "1.0.0", "failing"), false)
            .await
            .unwrap();
        let err = coordinator.enable(&admin, &reference).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::LoadError);
        assert!(coordinator.routes().is_empty().await);

        let row = coordinator.get(&admin, &reference).await.unwrap();
        assert_eq!(row.status, ExtensionStatus::Broken);
        assert!(!row.is_enabled);

        let err = coordinator.enable(&admin, &reference).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Broken);

        let cleared = coordinator.disable(&admin, &reference).await.unwrap();
        assert!(cleared.changed);
        assert_eq!(cleared.extension.status, ExtensionStatus::Installed);
        assert!(fixture.audit.actions().contains(&AuditAction::ExtensionBroken));
    }

    #[tokio::test]
    async fn test_enable_timeout_marks_broken() {
        let fixture = Fixture::with_timeout(1);
        let coordinator = fixture.coordinator();
        let admin = admin();
        let reference = ExtensionRef::key("Sluggish", "1.0.0");

        coordinator
            .install(&admin, package("Sluggish", "1.0.0", "slow"), false)
            .await
            .unwrap();
        let err = coordinator.enable(&admin, &reference).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(coordinator.routes().is_empty().await);
        let row = coordinator.get(&admin, &reference).await.unwrap();
        assert_eq!(row.status, ExtensionStatus::Broken);
    }

    #[tokio::test]
    async fn test_concurrent_enable_mounts_once() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();
        coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();

        let reference = pages_ref();
        let (a, b) = tokio::join!(
            coordinator.enable(&admin, &reference),
            coordinator.enable(&admin, &reference)
        );
        let changed = [a.unwrap().changed, b.unwrap().changed];
        assert_eq!(changed.iter().filter(|c| **c).count(), 1);
        assert_eq!(coordinator.routes().len().await, 2);
    }

    #[tokio::test]
    async fn test_uninstall_cascade_policy() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();
        let bob = Principal::member(UserId::new(), "bob");

        let installed = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        let id = installed.extension.id;
        coordinator.enable(&admin, &pages_ref()).await.unwrap();
        coordinator
            .engine()
            .grant(&admin, bob.user_id, EntityRef::extension(id), PermissionLevel::View, None)
            .await
            .unwrap();

        let err = coordinator
            .uninstall(&admin, &pages_ref(), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(coordinator.is_live(id).await);

        coordinator.uninstall(&admin, &pages_ref(), true).await.unwrap();
        assert!(!coordinator.is_live(id).await);
        assert!(coordinator.routes().is_empty().await);
        assert!(fixture.extensions.find_by_id(id).await.unwrap().is_none());
        assert!(!fixture.root.path().join("Pages_1.0.0").exists());
        assert_eq!(
            coordinator
                .engine()
                .count_for_entity(&EntityRef::extension(id))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_restore_reenables_flagged_rows() {
        let fixture = Fixture::new();
        let admin = admin();
        let before = fixture.coordinator();
        before
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        before
            .install(&admin, package("Blog", "1.0.0", "hello"), false)
            .await
            .unwrap();
        before.enable(&admin, &pages_ref()).await.unwrap();
        before.shutdown().await;
        assert!(before.routes().is_empty().await);

        let manifest = extensa_entity::extension::ExtensionManifest::from_toml(
            "name = \"Half\"\nversion = \"1.0.0\"\ntype = \"generic\"\n",
        )
        .unwrap();
        let interrupted = fixture
            .extensions
            .insert(&NewExtension::uploaded(manifest, "/nowhere"))
            .await
            .unwrap();

        let after = fixture.coordinator();
        let report = after.restore().await.unwrap();
        assert_eq!(
            report,
            RestoreReport {
                enabled: 1,
                failed: 0,
                marked_broken: 1,
            }
        );
        assert!(after.routes().resolve("/extensions/pages").await.is_some());
        assert!(after.routes().resolve("/extensions/blog").await.is_none());
        let half = fixture.extensions.find_by_id(interrupted.id).await.unwrap().unwrap();
        assert_eq!(half.status, ExtensionStatus::Broken);

        let second = after.restore().await.unwrap();
        assert_eq!(second.enabled, 1);
        assert_eq!(after.routes().len().await, 2);
    }

    #[tokio::test]
    async fn test_eager_schema_failure_leaves_no_row_or_package() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();

        let err = coordinator
            .install(&admin(), eager_package("Pages", "   "), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaError);
        assert!(fixture.extensions.list().await.unwrap().is_empty());
        assert!(!fixture.root.path().join("Pages_1.0.0").exists());
        assert_eq!(fixture.migrator.applied_count().await, 0);
        let staged = std::fs::read_dir(fixture.root.path().join(".staging"))
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(staged, 0);
    }

    #[tokio::test]
    async fn test_eager_schema_applies_before_any_enable() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();

        let installed = coordinator
            .install(&admin, eager_package("Pages", "CREATE TABLE pages (id INT);"), false)
            .await
            .unwrap();
        assert_eq!(installed.extension.status, ExtensionStatus::Installed);
        assert!(!installed.extension.is_enabled);
        assert!(!coordinator.is_live(installed.extension.id).await);
        assert!(fixture.migrator.is_applied("Pages", "001_init.sql").await);

        // Overwrite of a live install runs the schema phase again after teardown.
        coordinator.enable(&admin, &pages_ref()).await.unwrap();
        let replaced = coordinator
            .install(
                &admin,
                PackageBuilder::new()
                    .manifest(
                        "name = \"Pages\"\nversion = \"1.0.0\"\ntype = \"generic\"\neager_schema = true\n\n[routes]\nentrypoint = \"hello\"\n",
                    )
                    .file("schema/001_init.sql", "CREATE TABLE pages (id INT);")
                    .file("schema/002_slug.sql", "ALTER TABLE pages ADD slug TEXT;")
                    .build()
                    .unwrap(),
                true,
            )
            .await
            .unwrap();
        assert_eq!(replaced.extension.id, installed.extension.id);
        assert!(!replaced.extension.is_enabled);
        assert!(coordinator.routes().is_empty().await);
        assert!(fixture.migrator.is_applied("Pages", "002_slug.sql").await);
        assert_eq!(fixture.migrator.applied_count().await, 2);
    }

    #[tokio::test]
    async fn test_disable_hook_timeout_marks_broken_and_releases_routes() {
        let fixture = Fixture::with_timeout(1);
        let coordinator = fixture.coordinator();
        let admin = admin();
        let reference = ExtensionRef::key("Stuck", "1.0.0");

        let installed = coordinator
            .install(&admin, package("Stuck", "1.0.0", "hanging"), false)
            .await
            .unwrap();
        let id = installed.extension.id;
        coordinator.enable(&admin, &reference).await.unwrap();
        assert_eq!(coordinator.routes().len().await, 2);

        let err = tokio::time::timeout(Duration::from_secs(10), coordinator.disable(&admin, &reference))
            .await
            .expect("disable must be bounded by the operation timeout")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(coordinator.routes().is_empty().await);
        assert!(!coordinator.is_live(id).await);
        let row = fixture.extensions.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.status, ExtensionStatus::Broken);
        assert!(!row.is_enabled);
        assert!(fixture.audit.actions().contains(&AuditAction::ExtensionBroken));

        let err = coordinator.enable(&admin, &reference).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Broken);
        let cleared = coordinator.disable(&admin, &reference).await.unwrap();
        assert!(cleared.changed);
        assert_eq!(cleared.extension.status, ExtensionStatus::Installed);
        let enabled = coordinator.enable(&admin, &reference).await.unwrap();
        assert!(enabled.changed);
        assert_eq!(coordinator.routes().len().await, 2);
    }

    #[tokio::test]
    async fn test_abandoned_disable_never_leaves_a_serving_row() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();
        let reference = ExtensionRef::key("Stuck", "1.0.0");

        let installed = coordinator
            .install(&admin, package("Stuck", "1.0.0", "hanging"), false)
            .await
            .unwrap();
        let id = installed.extension.id;
        coordinator.enable(&admin, &reference).await.unwrap();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(200), coordinator.disable(&admin, &reference)).await;
        assert!(abandoned.is_err());

        let row = fixture.extensions.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.status, ExtensionStatus::Installed);
        assert!(!row.is_serving());
        assert!(!coordinator.is_live(id).await);
        assert!(coordinator.routes().is_empty().await);

        let enabled = coordinator.enable(&admin, &reference).await.unwrap();
        assert!(enabled.changed);
        assert!(enabled.extension.is_serving());
        assert_eq!(coordinator.routes().len().await, 2);
    }

    #[tokio::test]
    async fn test_enable_clears_mounts_left_by_interrupted_teardown() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();

        let installed = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        let id = installed.extension.id;
        coordinator.enable(&admin, &pages_ref()).await.unwrap();

        // Context dropped but routes still mounted.
        coordinator.contexts.write().await.remove(&id);
        fixture
            .extensions
            .update_state(id, ExtensionStatus::Installed, false)
            .await
            .unwrap();
        assert_eq!(coordinator.routes().len().await, 2);

        let enabled = coordinator.enable(&admin, &pages_ref()).await.unwrap();
        assert!(enabled.changed);
        assert_eq!(enabled.extension.status, ExtensionStatus::Active);
        assert_eq!(coordinator.routes().len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_uninstall_leaves_row_disabled() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator_with(Arc::new(UndeletableStore(fixture.extensions.clone())));
        let admin = admin();
        let bob = Principal::member(UserId::new(), "bob");

        let installed = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        let id = installed.extension.id;
        coordinator.enable(&admin, &pages_ref()).await.unwrap();
        coordinator
            .engine()
            .grant(&admin, bob.user_id, EntityRef::extension(id), PermissionLevel::View, None)
            .await
            .unwrap();
        assert!(
            coordinator
                .engine()
                .has_extension_permission(&bob, "Pages", PermissionLevel::View)
                .await
                .unwrap()
        );

        let err = coordinator.uninstall(&admin, &pages_ref(), true).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);

        let row = fixture.extensions.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.status, ExtensionStatus::Installed);
        assert!(!row.is_enabled);
        assert!(!coordinator.is_live(id).await);
        assert!(coordinator.routes().is_empty().await);
        assert!(fixture.root.path().join("Pages_1.0.0").is_dir());
        assert!(
            !coordinator
                .engine()
                .has_extension_permission(&bob, "Pages", PermissionLevel::View)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_install_releases_key_locks() {
        let fixture = Fixture::new();
        let coordinator = fixture.coordinator();
        let admin = admin();

        coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap();
        assert!(coordinator.key_locks.is_empty());

        let err = coordinator
            .install(&admin, package("Pages", "1.0.0", "hello"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(coordinator.key_locks.is_empty());

        let err = coordinator
            .install(&admin, eager_package("Blog", ""), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaError);
        assert!(coordinator.key_locks.is_empty());

        let (a, b) = tokio::join!(
            coordinator.install(&admin, package("Wiki", "1.0.0", "hello"), false),
            coordinator.install(&admin, package("Wiki", "1.0.0", "hello"), false)
        );
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert!(coordinator.key_locks.is_empty());
    }
}
