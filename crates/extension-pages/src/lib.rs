//! # extension-pages
//!
//! A compiled-in Extensa extension serving simple content pages.
//!
//! Registered under the entrypoint [`ENTRYPOINT`]. When enabled it mounts
//! one route group at its base path:
//!
//! - `GET /` lists pages
//! - `POST /` creates or replaces a page
//! - `GET /{slug}` fetches one page

pub mod handlers;
pub mod module;
pub mod package;
pub mod store;

pub use module::PagesModule;
pub use package::sample_package;
pub use store::{Page, PageStore};

use std::sync::Arc;

use extensa_plugin::{BuiltinModules, ExtensionModule};

/// Entrypoint name packages use to select this module.
pub const ENTRYPOINT: &str = "pages";

/// Registers the pages module with a compiled-in module catalog.
pub fn register(builtins: &mut BuiltinModules) {
    builtins.register(ENTRYPOINT, || {
        Arc::new(PagesModule::new()) as Arc<dyn ExtensionModule>
    });
}
