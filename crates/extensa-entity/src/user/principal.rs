//! Authenticated principal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use extensa_core::types::UserId;

use super::role::UserRole;

/// An authenticated actor on whose behalf a check or lifecycle action runs.
///
/// Credentials are verified upstream; the core only consumes the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier.
    pub user_id: UserId,
    /// Display name for logs and audit records.
    pub username: String,
    /// Coarse roles held by the principal.
    pub roles: Vec<UserRole>,
}

impl Principal {
    /// Create a principal.
    pub fn new(user_id: UserId, username: impl Into<String>, roles: Vec<UserRole>) -> Self {
        Self {
            user_id,
            username: username.into(),
            roles,
        }
    }

    /// Create a principal with no roles.
    pub fn member(user_id: UserId, username: impl Into<String>) -> Self {
        Self::new(user_id, username, vec![UserRole::Member])
    }

    /// Create a global-admin principal.
    pub fn admin(user_id: UserId, username: impl Into<String>) -> Self {
        Self::new(user_id, username, vec![UserRole::Admin])
    }

    /// The in-process system principal used for startup reconciliation and
    /// operator tooling.
    pub fn system() -> Self {
        Self::admin(UserId::from_uuid(Uuid::nil()), "system")
    }

    /// Check if the principal holds the global-admin role.
    pub fn is_global_admin(&self) -> bool {
        self.roles.iter().any(UserRole::is_admin)
    }

    /// Check if the principal holds the given role.
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}
