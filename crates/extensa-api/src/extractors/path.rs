//! Typed path parameter helpers.

use extensa_core::AppError;
use extensa_core::types::{PermissionId, UserId};
use extensa_entity::extension::ExtensionRef;

/// Parses an extension id or `name_version` key.
pub fn parse_extension_ref(s: &str) -> Result<ExtensionRef, AppError> {
    s.parse()
}

/// Parses a user id.
pub fn parse_user_id(s: &str) -> Result<UserId, AppError> {
    s.parse()
        .map_err(|_| AppError::validation(format!("Invalid user id: {s}")))
}

/// Parses a permission id.
pub fn parse_permission_id(s: &str) -> Result<PermissionId, AppError> {
    s.parse()
        .map_err(|_| AppError::validation(format!("Invalid permission id: {s}")))
}
