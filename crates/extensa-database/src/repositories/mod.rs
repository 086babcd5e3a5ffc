//! PostgreSQL implementations of the store traits.

pub mod extension;
pub mod permission;
pub mod schema;

pub use extension::ExtensionRepository;
pub use permission::PermissionRepository;
pub use schema::PgSchemaMigrator;
