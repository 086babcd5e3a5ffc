//! Dynamic module loader using `libloading` (feature-gated).
//!
//! A shared library provides a module by exporting
//! [`MODULE_CREATE_SYMBOL`] with the [`CreateModuleFn`] signature, usually
//! via [`export_extension_module!`](crate::export_extension_module). The
//! library must be built with the same compiler and `extensa-plugin`
//! version as the host.

use crate::module::ExtensionModule;

/// Symbol every extension shared library exports.
pub const MODULE_CREATE_SYMBOL: &[u8] = b"extensa_module_create";

/// Signature of the exported module constructor.
pub type CreateModuleFn = unsafe fn() -> Box<dyn ExtensionModule>;

#[cfg(feature = "dynamic")]
mod imp {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use tracing::info;

    use extensa_core::AppError;
    use extensa_core::result::AppResult;

    use super::{CreateModuleFn, MODULE_CREATE_SYMBOL};
    use crate::module::ExtensionModule;

    /// A loaded shared library, kept alive for as long as code from it may
    /// run.
    pub struct LoadedLibrary {
        _library: libloading::Library,
        path: PathBuf,
    }

    impl std::fmt::Debug for LoadedLibrary {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LoadedLibrary")
                .field("path", &self.path)
                .finish_non_exhaustive()
        }
    }

    impl LoadedLibrary {
        /// Path the library was loaded from.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    /// Loads extension modules from shared libraries.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DynamicLoader;

    impl DynamicLoader {
        /// Creates a new dynamic loader.
        pub fn new() -> Self {
            Self
        }

        /// Returns whether this build can load shared libraries.
        pub fn is_supported(&self) -> bool {
            true
        }

        /// Loads a module from the given shared library path.
        ///
        /// # Safety
        /// This loads and runs arbitrary native code in the host process.
        /// Only load trusted packages.
        pub unsafe fn load_from_path(
            &self,
            path: &Path,
        ) -> AppResult<(Arc<dyn ExtensionModule>, LoadedLibrary)> {
            let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
                AppError::load(format!(
                    "Failed to load extension library '{}': {e}",
                    path.display()
                ))
            })?;

            let module: Box<dyn ExtensionModule> = {
                let create: libloading::Symbol<'_, CreateModuleFn> =
                    unsafe { library.get(MODULE_CREATE_SYMBOL) }.map_err(|e| {
                        AppError::load(format!(
                            "Library '{}' does not export 'extensa_module_create': {e}",
                            path.display()
                        ))
                    })?;
                unsafe { create() }
            };

            info!(path = %path.display(), "Dynamic extension module loaded");

            Ok((
                Arc::from(module),
                LoadedLibrary {
                    _library: library,
                    path: path.to_path_buf(),
                },
            ))
        }
    }
}

/// Stub loader when the `dynamic` feature is not enabled.
#[cfg(not(feature = "dynamic"))]
mod imp {
    use std::path::Path;
    use std::sync::Arc;

    use extensa_core::AppError;
    use extensa_core::result::AppResult;

    use crate::module::ExtensionModule;

    /// Placeholder for a loaded library; never constructed.
    #[derive(Debug)]
    pub enum LoadedLibrary {}

    /// Stub dynamic loader.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DynamicLoader;

    impl DynamicLoader {
        /// Creates a stub loader.
        pub fn new() -> Self {
            Self
        }

        /// Returns whether this build can load shared libraries.
        pub fn is_supported(&self) -> bool {
            false
        }

        /// Always fails with `LOAD_ERROR`.
        ///
        /// # Safety
        /// Always safe; the signature mirrors the real loader.
        pub unsafe fn load_from_path(
            &self,
            path: &Path,
        ) -> AppResult<(Arc<dyn ExtensionModule>, LoadedLibrary)> {
            Err(AppError::load(format!(
                "Cannot load '{}': built without the 'dynamic' feature",
                path.display()
            )))
        }
    }
}

pub use imp::{DynamicLoader, LoadedLibrary};
