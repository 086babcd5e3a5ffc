//! In-memory implementations of the store traits.
//!
//! Suitable for tests and single-process development; they enforce the same
//! uniqueness rules as the PostgreSQL schema.

pub mod extension;
pub mod permission;
pub mod schema;

pub use extension::MemoryExtensionStore;
pub use permission::MemoryPermissionStore;
pub use schema::MemorySchemaMigrator;
