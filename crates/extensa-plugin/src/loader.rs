//! Extension loader: validate a package, instantiate its module, run its
//! schema phase.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use extensa_core::AppError;
use extensa_core::error::ErrorKind;
use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;
use extensa_database::store::SchemaMigrator;

use crate::dynamic::{DynamicLoader, LoadedLibrary};
use crate::guard::{guard_sync, rekind};
use crate::handle::ModuleHandle;
use crate::module::ExtensionModule;
use crate::package::PackageLayout;
use crate::source::BuiltinModules;

/// Loads extension packages into module handles.
///
/// Loading validates the package, instantiates its route unit (a compiled-in
/// module or a shared library), and applies its schema before returning.
/// Mounting routes is left to the caller so that loading and activation can
/// be retried independently.
#[derive(Debug)]
pub struct ExtensionLoader {
    /// Compiled-in modules.
    builtins: BuiltinModules,
    /// Shared-library loader.
    dynamic: DynamicLoader,
    /// Applies schema contributions.
    migrator: Arc<dyn SchemaMigrator>,
}

impl ExtensionLoader {
    /// Creates a new loader.
    pub fn new(builtins: BuiltinModules, migrator: Arc<dyn SchemaMigrator>) -> Self {
        Self {
            builtins,
            dynamic: DynamicLoader::new(),
            migrator,
        }
    }

    /// Validates the package at `root` without instantiating anything.
    ///
    /// Fails with `INVALID_PACKAGE` for a bad layout or manifest and with
    /// `LOAD_ERROR` if the route unit cannot be resolved in this host.
    pub async fn inspect(&self, root: &Path) -> AppResult<PackageLayout> {
        let root: PathBuf = root.to_path_buf();
        let layout = tokio::task::spawn_blocking(move || PackageLayout::read(&root))
            .await
            .map_err(|e| AppError::internal(format!("Package inspection task failed: {e}")))??;
        self.check_resolvable(&layout)?;
        Ok(layout)
    }

    /// Checks that the route unit of a layout can be instantiated.
    pub fn check_resolvable(&self, layout: &PackageLayout) -> AppResult<()> {
        let Some(routes) = &layout.manifest.routes else {
            return Ok(());
        };
        if routes.library.is_some() {
            if !self.dynamic.is_supported() {
                return Err(AppError::load(format!(
                    "Extension '{}' ships a shared library but dynamic loading is disabled",
                    layout.key()
                )));
            }
        } else if !self.builtins.contains(&routes.entrypoint) {
            return Err(AppError::load(format!(
                "Extension '{}' names unknown entrypoint '{}'",
                layout.key(),
                routes.entrypoint
            )));
        }
        Ok(())
    }

    /// Loads the package at `root` for extension `id`.
    ///
    /// Schema is applied before the handle is returned, so an extension's
    /// tables exist before any of its routes can be mounted.
    pub async fn load(&self, root: &Path, id: ExtensionId) -> AppResult<ModuleHandle> {
        let layout = self.inspect(root).await?;
        let (module, library) = self.instantiate(&layout)?;
        let applied = self.apply_schema(&layout, module.as_ref()).await?;

        info!(
            extension_id = %id,
            key = %layout.key(),
            dynamic = library.is_some(),
            migrations = applied,
            "Extension module loaded"
        );

        Ok(ModuleHandle::new(id, layout, module, library))
    }

    /// Applies the package's schema files and the module's schema hook.
    pub async fn apply_schema(
        &self,
        layout: &PackageLayout,
        module: Option<&Arc<dyn ExtensionModule>>,
    ) -> AppResult<usize> {
        let key = layout.key();
        let mut migrations = layout.schema.clone();
        if let Some(module) = module {
            let contributed = guard_sync(&key, "contribute_schema", ErrorKind::SchemaError, || {
                module.contribute_schema()
            })?;
            migrations.extend(contributed);
        }
        if migrations.is_empty() {
            return Ok(0);
        }

        self.migrator
            .apply(&layout.manifest.name, &migrations)
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Extension schema failed");
                rekind(&key, "schema", ErrorKind::SchemaError, e)
            })
    }

    fn instantiate(
        &self,
        layout: &PackageLayout,
    ) -> AppResult<(Option<Arc<dyn ExtensionModule>>, Option<LoadedLibrary>)> {
        let Some(routes) = &layout.manifest.routes else {
            return Ok((None, None));
        };
        let key = layout.key();

        if let Some(path) = layout.library_path() {
            let dynamic = self.dynamic;
            let (module, library) = guard_sync(&key, "load", ErrorKind::LoadError, || {
                // SAFETY: packages are installed by global admins only; the
                // library is trusted at that point.
                unsafe { dynamic.load_from_path(&path) }
            })??;
            return Ok((Some(module), Some(library)));
        }

        let factory = self.builtins.factory(&routes.entrypoint).ok_or_else(|| {
            AppError::load(format!(
                "Extension '{key}' names unknown entrypoint '{}'",
                routes.entrypoint
            ))
        })?;
        let module = guard_sync(&key, "instantiate", ErrorKind::LoadError, || factory())?;
        Ok((Some(module), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use extensa_database::memory::MemorySchemaMigrator;
    use extensa_entity::extension::SchemaMigration;
    use extensa_entity::extension::manifest::MANIFEST_FILE;

    #[derive(Debug)]
    struct Schemaful;

    #[async_trait]
    impl ExtensionModule for Schemaful {
        fn contribute_schema(&self) -> Vec<SchemaMigration> {
            vec![SchemaMigration::new("900_hook.sql", "CREATE TABLE hook (id INT);")]
        }
    }

    #[derive(Debug)]
    struct Exploding;

    #[async_trait]
    impl ExtensionModule for Exploding {
        fn contribute_schema(&self) -> Vec<SchemaMigration> {
            panic!("schema hook exploded")
        }
    }

    fn package(manifest: &str, schema: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        if !schema.is_empty() {
            std::fs::create_dir_all(dir.path().join("schema")).unwrap();
            for (name, sql) in schema {
                std::fs::write(dir.path().join("schema").join(name), sql).unwrap();
            }
        }
        dir
    }

    fn loader(migrator: &MemorySchemaMigrator) -> ExtensionLoader {
        let builtins = BuiltinModules::new()
            .with("schemaful", || Arc::new(Schemaful) as Arc<dyn ExtensionModule>)
            .with("exploding", || Arc::new(Exploding) as Arc<dyn ExtensionModule>);
        ExtensionLoader::new(builtins, Arc::new(migrator.clone()))
    }

    #[tokio::test]
    async fn test_load_applies_package_and_hook_schema() {
        let migrator = MemorySchemaMigrator::new();
        let dir = package(
            "name = \"Pages\"\nversion = \"1.0.0\"\ntype = \"generic\"\n[routes]\nentrypoint = \"schemaful\"\n",
            &[("001_pages.sql", "CREATE TABLE pages (id INT);")],
        );

        let handle = loader(&migrator).load(dir.path(), ExtensionId(1)).await.unwrap();
        assert!(handle.module().is_some());
        assert!(!handle.is_dynamic());
        assert!(migrator.is_applied("Pages", "001_pages.sql").await);
        assert!(migrator.is_applied("Pages", "900_hook.sql").await);
    }

    #[tokio::test]
    async fn test_schema_only_package_has_no_module() {
        let migrator = MemorySchemaMigrator::new();
        let dir = package(
            "name = \"Tables\"\nversion = \"1.0.0\"\ntype = \"generic\"\n",
            &[("001.sql", "CREATE TABLE x (id INT);")],
        );
        let handle = loader(&migrator).load(dir.path(), ExtensionId(2)).await.unwrap();
        assert!(handle.module().is_none());
    }

    #[tokio::test]
    async fn test_unknown_entrypoint_is_load_error() {
        let migrator = MemorySchemaMigrator::new();
        let dir = package(
            "name = \"Ghost\"\nversion = \"1.0.0\"\ntype = \"generic\"\n[routes]\nentrypoint = \"ghost\"\n",
            &[],
        );
        let err = loader(&migrator)
            .load(dir.path(), ExtensionId(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::LoadError);
    }

    #[tokio::test]
    async fn test_panicking_schema_hook_is_schema_error() {
        let migrator = MemorySchemaMigrator::new();
        let dir = package(
            "name = \"Boom\"\nversion = \"1.0.0\"\ntype = \"generic\"\n[routes]\nentrypoint = \"exploding\"\n",
            &[],
        );
        let err = loader(&migrator)
            .load(dir.path(), ExtensionId(4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaError);
        assert!(err.message.contains("exploded"));
    }

    #[tokio::test]
    async fn test_failing_migration_is_schema_error() {
        let migrator = MemorySchemaMigrator::new();
        let dir = package(
            "name = \"Bad\"\nversion = \"1.0.0\"\ntype = \"generic\"\n",
            &[("001.sql", "   ")],
        );
        let err = loader(&migrator)
            .load(dir.path(), ExtensionId(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaError);
    }
}
