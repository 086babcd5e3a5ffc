//! Extension lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Durable lifecycle status of an installed extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "extension_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    /// The package is unpacked and validated; installation is in progress.
    Uploaded,
    /// Installed and not serving.
    Installed,
    /// Enabled and serving routes.
    Active,
    /// Explicitly disabled.
    Disabled,
    /// A transition failed; needs Disable+Enable or Uninstall.
    Broken,
}

impl ExtensionStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Installed => "installed",
            Self::Active => "active",
            Self::Disabled => "disabled",
            Self::Broken => "broken",
        }
    }

    /// Check whether this status represents a serving extension.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExtensionStatus {
    type Err = extensa_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uploaded" => Ok(Self::Uploaded),
            "installed" => Ok(Self::Installed),
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            "broken" => Ok(Self::Broken),
            _ => Err(extensa_core::AppError::validation(format!(
                "Invalid extension status: '{s}'"
            ))),
        }
    }
}
