//! Permission row entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use extensa_core::types::{PermissionId, UserId};

use super::level::PermissionLevel;

/// Entity type tag used for permission rows on extensions.
pub const EXTENSION_ENTITY: &str = "extension";

/// Entity id denoting every entity of a type (a type-wide grant).
pub const WILDCARD_ENTITY_ID: &str = "*";

/// A typed reference to a permission-checkable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Free-form entity type tag (`page`, `dashboard`, `extension`, ...).
    pub entity_type: String,
    /// Entity id within the type, or `*` for the whole type.
    pub entity_id: String,
}

impl EntityRef {
    /// Create an entity reference.
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// Reference every entity of the given type.
    pub fn type_wide(entity_type: impl Into<String>) -> Self {
        Self::new(entity_type, WILDCARD_ENTITY_ID)
    }

    /// Reference an extension entity by its id.
    pub fn extension(id: impl ToString) -> Self {
        Self::new(EXTENSION_ENTITY, id.to_string())
    }

    /// Check whether this reference is a type-wide wildcard.
    pub fn is_type_wide(&self) -> bool {
        self.entity_id == WILDCARD_ENTITY_ID
    }

    /// Return the type-wide reference for this entity's type.
    pub fn to_type_wide(&self) -> Self {
        Self::type_wide(self.entity_type.clone())
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}

/// "Principal may act on entity up to level L."
///
/// At most one row exists per `(user_id, entity_type, entity_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: PermissionId,
    /// Principal holding the permission.
    pub user_id: UserId,
    /// Entity type tag.
    pub entity_type: String,
    /// Entity id within the type.
    pub entity_id: String,
    /// Granted level.
    pub permission_level: PermissionLevel,
    /// Principal who granted (or last re-granted) the permission.
    pub granted_by: UserId,
    /// When the permission was last granted.
    pub granted_at: DateTime<Utc>,
    /// When this permission expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Check if this permission has expired at the given instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Return the entity this row applies to.
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id.clone())
    }
}

/// Data required to grant (upsert) a permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    /// Principal receiving the permission.
    pub user_id: UserId,
    /// Target entity.
    pub entity: EntityRef,
    /// Granted level.
    pub level: PermissionLevel,
    /// Grantor.
    pub granted_by: UserId,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}
