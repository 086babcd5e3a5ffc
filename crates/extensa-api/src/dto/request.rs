//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use extensa_core::AppError;

/// Grant permission request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GrantPermissionRequest {
    /// Principal receiving the grant.
    pub user_id: Uuid,
    /// Entity type tag.
    #[validate(length(min = 1, max = 64, message = "entity_type must be 1-64 characters"))]
    pub entity_type: String,
    /// Entity id, or `*` for the whole type.
    #[validate(length(min = 1, max = 255, message = "entity_id must be 1-255 characters"))]
    pub entity_id: String,
    /// Level name (`none`, `view`, `edit`, `delete`, `admin`).
    pub level: String,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Query of `POST /api/extensions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallQuery {
    /// Replace an existing installation of the same key.
    #[serde(default)]
    pub overwrite: bool,
}

/// Query of `DELETE /api/extensions/{ref}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UninstallQuery {
    /// Delete the extension's permission rows along with it.
    #[serde(default)]
    pub cascade: bool,
}

/// Query of `GET /api/extensions/by-name/{name}/access`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessQuery {
    /// Required level, `view` when absent.
    pub level: Option<String>,
}

/// Query of `GET /api/permissions/check`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckQuery {
    /// Subject; the caller when absent.
    pub user_id: Option<Uuid>,
    /// Entity type tag.
    #[validate(length(min = 1, max = 64))]
    pub entity_type: String,
    /// Entity id.
    #[validate(length(min = 1, max = 255))]
    pub entity_id: String,
    /// Required level name.
    pub level: String,
}

/// Runs `validator` rules and maps failures to a `VALIDATION` error.
pub fn validated<T: Validate>(value: T) -> Result<T, AppError> {
    value
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid request: {e}")))?;
    Ok(value)
}
