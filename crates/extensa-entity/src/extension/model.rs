//! Installed extension entity model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use extensa_core::AppError;
use extensa_core::types::ExtensionId;

use super::kind::ExtensionType;
use super::manifest::ExtensionManifest;
use super::status::ExtensionStatus;

/// An installed extension package as recorded in the registry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Extension {
    /// Database-generated identifier.
    pub id: ExtensionId,
    /// Logical name from the manifest.
    pub name: String,
    /// Semantic version from the manifest.
    pub version: String,
    /// Lifecycle status.
    pub status: ExtensionStatus,
    /// Durable enabled flag, used to re-initialise after restart.
    pub is_enabled: bool,
    /// Functional classification.
    #[serde(rename = "type")]
    pub extension_type: ExtensionType,
    /// Location of the unpacked package on disk.
    pub file_path: String,
    /// Validated manifest captured at install time.
    pub manifest: Json<ExtensionManifest>,
    /// When the extension was first installed.
    pub created_at: DateTime<Utc>,
    /// When the row was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Extension {
    /// Return the `name_version` key.
    pub fn key(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    /// Return the entity id used for permission rows on this extension.
    pub fn entity_id(&self) -> String {
        self.id.to_string()
    }

    /// Check whether this extension is both flagged enabled and serving.
    pub fn is_serving(&self) -> bool {
        self.is_enabled && self.status.is_active()
    }

    /// Check whether this extension is in the broken state.
    pub fn is_broken(&self) -> bool {
        self.status == ExtensionStatus::Broken
    }

    /// Return the parsed semantic version.
    pub fn semver(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version).ok()
    }
}

/// Data required to record a newly uploaded extension.
#[derive(Debug, Clone)]
pub struct NewExtension {
    /// Validated manifest.
    pub manifest: ExtensionManifest,
    /// Final on-disk location of the unpacked package.
    pub file_path: String,
    /// Initial status.
    pub status: ExtensionStatus,
}

impl NewExtension {
    /// Build an insert record in the `uploaded` state.
    pub fn uploaded(manifest: ExtensionManifest, file_path: impl Into<String>) -> Self {
        Self {
            manifest,
            file_path: file_path.into(),
            status: ExtensionStatus::Uploaded,
        }
    }

    /// Return the `name_version` key of the record.
    pub fn key(&self) -> String {
        self.manifest.key()
    }
}

/// A reference to an extension by numeric id or by `name_version` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExtensionRef {
    /// The database-generated id.
    Id(ExtensionId),
    /// The `(name, version)` key.
    Key {
        /// Logical name.
        name: String,
        /// Version string.
        version: String,
    },
}

impl ExtensionRef {
    /// Build a key reference.
    pub fn key(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Key {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl From<ExtensionId> for ExtensionRef {
    fn from(id: ExtensionId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for ExtensionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Key { name, version } => write!(f, "{name}_{version}"),
        }
    }
}

impl FromStr for ExtensionRef {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let id = s
                .parse::<ExtensionId>()
                .map_err(|e| AppError::validation(format!("Invalid extension id '{s}': {e}")))?;
            return Ok(Self::Id(id));
        }

        match s.rsplit_once('_') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(Self::key(name, version))
            }
            _ => Err(AppError::validation(format!(
                "Invalid extension reference '{s}': expected an id or 'name_version'"
            ))),
        }
    }
}
