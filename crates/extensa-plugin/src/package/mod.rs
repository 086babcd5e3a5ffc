//! Extension package archives.
//!
//! A package is a gzip-compressed tar archive with `extension.toml` at its
//! root (optionally under a single top-level directory), SQL migrations
//! under `schema/`, and an optional shared library for the route unit.

pub mod builder;
pub mod extract;
pub mod layout;

pub use builder::PackageBuilder;
pub use extract::{ExtractLimits, extract_archive};
pub use layout::PackageLayout;

/// Directory holding SQL migrations inside a package.
pub const SCHEMA_DIR: &str = "schema";
