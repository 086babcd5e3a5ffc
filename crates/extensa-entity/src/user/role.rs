//! Coarse principal roles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse roles layered above fine-grained permission rows.
///
/// `Admin` is the global-admin bypass for every permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Global administrator.
    Admin,
    /// Operator without the global bypass.
    Manager,
    /// Regular member.
    Member,
}

impl UserRole {
    /// Check if this role is the global-admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = extensa_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "member" => Ok(Self::Member),
            _ => Err(extensa_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: admin, manager, member"
            ))),
        }
    }
}
