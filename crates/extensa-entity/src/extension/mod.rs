//! Extension domain entities.

pub mod kind;
pub mod manifest;
pub mod model;
pub mod schema;
pub mod status;

pub use kind::ExtensionType;
pub use manifest::{ExtensionManifest, RoutesUnit};
pub use model::{Extension, ExtensionRef, NewExtension};
pub use schema::SchemaMigration;
pub use status::ExtensionStatus;
