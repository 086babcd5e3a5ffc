//! Graded permission levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Graded access level on an entity.
///
/// Totally ordered: `None < View < Edit < Delete < Admin`. Holding a level
/// implies every lower level.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// No access.
    None = 0,
    /// Read-only access.
    View = 1,
    /// Can modify the entity.
    Edit = 2,
    /// Can delete the entity.
    Delete = 3,
    /// Full control, including granting and revoking.
    Admin = 4,
}

impl PermissionLevel {
    /// All levels in ascending order.
    pub const ALL: [PermissionLevel; 5] = [
        Self::None,
        Self::View,
        Self::Edit,
        Self::Delete,
        Self::Admin,
    ];

    /// Return the numeric rank.
    pub fn rank(&self) -> i16 {
        *self as i16
    }

    /// Check if this level grants at least the required level.
    pub fn satisfies(&self, required: PermissionLevel) -> bool {
        *self >= required
    }

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::View => "view",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = extensa_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "view" => Ok(Self::View),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "admin" => Ok(Self::Admin),
            _ => Err(extensa_core::AppError::validation(format!(
                "Invalid permission level: '{s}'. Expected one of: none, view, edit, delete, admin"
            ))),
        }
    }
}

impl TryFrom<i16> for PermissionLevel {
    type Error = extensa_core::AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|level| level.rank() == value)
            .ok_or_else(|| {
                extensa_core::AppError::validation(format!("Invalid permission rank: {value}"))
            })
    }
}
