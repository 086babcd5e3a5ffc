//! # extensa-database
//!
//! Persistence for Extensa: the PostgreSQL connection pool and migrations,
//! the store traits the permission engine and lifecycle coordinator are
//! written against, and their PostgreSQL and in-memory implementations.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{ExtensionStore, PermissionStore, SchemaMigrator};
