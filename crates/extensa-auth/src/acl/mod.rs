//! Entity permission checking, granting and revocation.

pub mod engine;
pub mod extension;

pub use engine::PermissionEngine;
