//! Catalog of compiled-in extension modules.

use std::collections::HashMap;
use std::sync::Arc;

use crate::module::ExtensionModule;

/// Creates a fresh module instance.
pub type ModuleFactory = Arc<dyn Fn() -> Arc<dyn ExtensionModule> + Send + Sync>;

/// Compiled-in module factories keyed by manifest entrypoint.
///
/// Each call to [`BuiltinModules::create`] yields a new instance, so two
/// installed versions sharing an entrypoint never share state.
#[derive(Clone, Default)]
pub struct BuiltinModules {
    factories: HashMap<String, ModuleFactory>,
}

impl std::fmt::Debug for BuiltinModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("BuiltinModules")
            .field("entrypoints", &names)
            .finish()
    }
}

impl BuiltinModules {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under an entrypoint, replacing any previous one.
    pub fn register<F>(&mut self, entrypoint: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ExtensionModule> + Send + Sync + 'static,
    {
        self.factories.insert(entrypoint.into(), Arc::new(factory));
    }

    /// Builder form of [`BuiltinModules::register`].
    pub fn with<F>(mut self, entrypoint: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ExtensionModule> + Send + Sync + 'static,
    {
        self.register(entrypoint, factory);
        self
    }

    /// Returns whether an entrypoint is registered.
    pub fn contains(&self, entrypoint: &str) -> bool {
        self.factories.contains_key(entrypoint)
    }

    /// Returns the factory for an entrypoint.
    pub fn factory(&self, entrypoint: &str) -> Option<ModuleFactory> {
        self.factories.get(entrypoint).cloned()
    }

    /// Returns the registered entrypoints, sorted.
    pub fn entrypoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
