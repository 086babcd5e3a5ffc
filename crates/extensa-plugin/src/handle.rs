//! Handle to a loaded extension module.

use std::sync::Arc;

use extensa_core::types::ExtensionId;

use crate::dynamic::LoadedLibrary;
use crate::module::ExtensionModule;
use crate::package::PackageLayout;

/// A loaded extension: its module instance (if it has a route unit) and the
/// package it came from.
///
/// Each handle is a separate instance keyed by extension id, so two
/// versions of one logical extension never share module state.
#[derive(Debug)]
pub struct ModuleHandle {
    /// Owning extension.
    pub extension_id: ExtensionId,
    /// Validated package layout.
    pub layout: PackageLayout,
    /// Module instance; dropped before `library`.
    module: Option<Arc<dyn ExtensionModule>>,
    /// Shared library the module came from, if loaded dynamically.
    library: Option<LoadedLibrary>,
}

impl ModuleHandle {
    /// Creates a handle.
    pub fn new(
        extension_id: ExtensionId,
        layout: PackageLayout,
        module: Option<Arc<dyn ExtensionModule>>,
        library: Option<LoadedLibrary>,
    ) -> Self {
        Self {
            extension_id,
            layout,
            module,
            library,
        }
    }

    /// Returns the module instance, if the package has a route unit.
    pub fn module(&self) -> Option<&Arc<dyn ExtensionModule>> {
        self.module.as_ref()
    }

    /// Returns the `name_version` key.
    pub fn key(&self) -> String {
        self.layout.key()
    }

    /// Returns whether the module came from a shared library.
    pub fn is_dynamic(&self) -> bool {
        self.library.is_some()
    }
}
