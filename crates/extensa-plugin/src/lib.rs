//! # extensa-plugin
//!
//! Extension framework for Extensa. Provides:
//!
//! - The `ExtensionModule` interface extensions implement (schema and route
//!   contribution hooks, enable/disable hooks)
//! - Package archive extraction, layout validation and building
//! - The `ExtensionLoader` resolving compiled-in modules and, with the
//!   `dynamic` feature, shared libraries via `libloading`
//! - The `RouteTable` that mounts, unmounts and dispatches to extension
//!   routers at runtime
//! - The `LifecycleCoordinator` state machine keeping the durable registry
//!   and the runtime contexts consistent

pub mod api;
pub mod context;
pub mod coordinator;
pub mod dynamic;
pub mod guard;
pub mod handle;
pub mod loader;
pub mod macros;
pub mod module;
pub mod package;
pub mod registry;
pub mod routes;
pub mod source;

pub use api::context::ModuleContext;
pub use context::ExtensionContext;
pub use coordinator::{LifecycleCoordinator, LifecycleOutcome, RestoreReport};
pub use handle::ModuleHandle;
pub use loader::ExtensionLoader;
pub use module::{ExtensionModule, RouteGroup};
pub use package::{PackageBuilder, PackageLayout};
pub use registry::ModuleRegistry;
pub use routes::RouteTable;
pub use source::{BuiltinModules, ModuleFactory};
