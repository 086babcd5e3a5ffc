//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use extensa_core::types::{ExtensionId, UserId};
use extensa_entity::extension::{Extension, ExtensionStatus, ExtensionType};
use extensa_entity::permission::PermissionLevel;
use extensa_plugin::LifecycleOutcome;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// `connected`, `unavailable`, or `memory`.
    pub database: String,
    /// Extensions with a live runtime context.
    pub live_extensions: usize,
    /// Mounted extension route groups.
    pub mounted_routes: usize,
}

/// Extension summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionResponse {
    /// Extension id.
    pub id: ExtensionId,
    /// `name_version` key.
    pub key: String,
    /// Logical name.
    pub name: String,
    /// Version.
    pub version: String,
    /// Lifecycle status.
    pub status: ExtensionStatus,
    /// Durable enabled flag.
    pub is_enabled: bool,
    /// Functional classification.
    #[serde(rename = "type")]
    pub extension_type: ExtensionType,
    /// Description from the manifest.
    pub description: Option<String>,
    /// Where the extension's routes are mounted when enabled.
    pub mount_base: String,
    /// Supported locales.
    pub locales: Vec<String>,
    /// Declared capabilities.
    pub capabilities: Vec<String>,
    /// Installed at.
    pub created_at: DateTime<Utc>,
    /// Last changed at.
    pub updated_at: DateTime<Utc>,
}

impl From<Extension> for ExtensionResponse {
    fn from(ext: Extension) -> Self {
        let key = ext.key();
        let manifest = ext.manifest.0;
        Self {
            id: ext.id,
            key,
            name: ext.name,
            version: ext.version,
            status: ext.status,
            is_enabled: ext.is_enabled,
            extension_type: ext.extension_type,
            mount_base: manifest.mount_base(),
            description: manifest.description,
            locales: manifest.locales,
            capabilities: manifest.capabilities,
            created_at: ext.created_at,
            updated_at: ext.updated_at,
        }
    }
}

/// Result of a lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleResponse {
    /// The extension after the transition.
    pub extension: ExtensionResponse,
    /// `false` when the extension was already in the requested state.
    pub changed: bool,
}

impl From<LifecycleOutcome> for LifecycleResponse {
    fn from(outcome: LifecycleOutcome) -> Self {
        Self {
            extension: outcome.extension.into(),
            changed: outcome.changed,
        }
    }
}

/// Result of a permission check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Subject of the check.
    pub user_id: UserId,
    /// Checked entity type.
    pub entity_type: String,
    /// Checked entity id.
    pub entity_id: String,
    /// Required level.
    pub level: PermissionLevel,
    /// Whether access is granted.
    pub allowed: bool,
}

/// Result of an extension access check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    /// Logical extension name.
    pub name: String,
    /// Required level.
    pub level: PermissionLevel,
    /// Whether access is granted.
    pub allowed: bool,
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}
