//! Validated on-disk package layout.

use std::path::{Component, Path, PathBuf};

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_entity::extension::manifest::MANIFEST_FILE;
use extensa_entity::extension::{ExtensionManifest, SchemaMigration};

use super::SCHEMA_DIR;

/// An unpacked package whose manifest and units have been validated.
#[derive(Debug, Clone)]
pub struct PackageLayout {
    /// Package root directory.
    pub root: PathBuf,
    /// Parsed manifest.
    pub manifest: ExtensionManifest,
    /// `schema/*.sql` files in file-name order.
    pub schema: Vec<SchemaMigration>,
}

impl PackageLayout {
    /// Reads and validates the package rooted at `root`.
    ///
    /// A package must declare a route unit, ship schema files, or both.
    /// Blocking; run it on the blocking pool.
    pub fn read(root: &Path) -> AppResult<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(AppError::invalid_package(format!(
                "Package has no {MANIFEST_FILE}"
            )));
        }
        let text = std::fs::read_to_string(&manifest_path).map_err(|e| {
            AppError::invalid_package(format!("Unreadable {MANIFEST_FILE}: {e}"))
        })?;
        let manifest = ExtensionManifest::from_toml(&text)?;

        let schema = read_schema(&root.join(SCHEMA_DIR))?;

        if manifest.routes.is_none() && schema.is_empty() {
            return Err(AppError::invalid_package(format!(
                "Extension '{}' declares neither a [routes] unit nor schema files",
                manifest.key()
            )));
        }

        if let Some(library) = manifest.routes.as_ref().and_then(|r| r.library.as_deref()) {
            let relative = Path::new(library);
            let escapes = relative.is_absolute()
                || relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(AppError::invalid_package(format!(
                    "Library path '{library}' must stay inside the package"
                )));
            }
            if !root.join(relative).is_file() {
                return Err(AppError::invalid_package(format!(
                    "Library '{library}' is missing from the package"
                )));
            }
        }

        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            schema,
        })
    }

    /// Returns the `name_version` key.
    pub fn key(&self) -> String {
        self.manifest.key()
    }

    /// Returns the absolute path of the route unit's shared library, if any.
    pub fn library_path(&self) -> Option<PathBuf> {
        self.manifest
            .routes
            .as_ref()
            .and_then(|r| r.library.as_ref())
            .map(|lib| self.root.join(lib))
    }
}

fn read_schema(dir: &Path) -> AppResult<Vec<SchemaMigration>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "sql"))
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let sql = std::fs::read_to_string(&path).map_err(|e| {
                AppError::invalid_package(format!("Unreadable schema file '{name}': {e}"))
            })?;
            Ok(SchemaMigration::new(name, sql))
        })
        .collect()
}
