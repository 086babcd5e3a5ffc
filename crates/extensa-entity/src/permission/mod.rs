//! Entity permission domain types.

pub mod level;
pub mod model;

pub use level::PermissionLevel;
pub use model::{EXTENSION_ENTITY, EntityRef, NewPermission, Permission, WILDCARD_ENTITY_ID};
