//! Schema contributions made by extensions.

use serde::{Deserialize, Serialize};

/// A single named migration an extension contributes to the persistent store.
///
/// Names are unique per extension; a migrator records applied names so the
/// same migration is never executed twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMigration {
    /// Migration name, e.g. the source file name.
    pub name: String,
    /// SQL to execute.
    pub sql: String,
}

impl SchemaMigration {
    /// Creates a migration.
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}
