//! Audit event model emitted by the permission engine and the lifecycle
//! coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use extensa_core::types::UserId;

/// The action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A permission was granted or re-granted.
    PermissionGranted,
    /// A permission was revoked.
    PermissionRevoked,
    /// An extension package was installed.
    ExtensionInstalled,
    /// An extension was enabled.
    ExtensionEnabled,
    /// An extension was disabled.
    ExtensionDisabled,
    /// An extension was uninstalled.
    ExtensionUninstalled,
    /// An extension transition failed and left it broken.
    ExtensionBroken,
}

impl AuditAction {
    /// Return the action as a dotted string, e.g. `"permission.grant"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionGranted => "permission.grant",
            Self::PermissionRevoked => "permission.revoke",
            Self::ExtensionInstalled => "extension.install",
            Self::ExtensionEnabled => "extension.enable",
            Self::ExtensionDisabled => "extension.disable",
            Self::ExtensionUninstalled => "extension.uninstall",
            Self::ExtensionBroken => "extension.broken",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An audit event handed to the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// The action performed.
    pub action: AuditAction,
    /// The principal who performed it.
    pub actor_id: UserId,
    /// Target entity type (e.g., `"extension"`, `"permission"`).
    pub target_type: String,
    /// Target entity id.
    pub target_id: String,
    /// Additional details.
    pub details: serde_json::Value,
    /// When the action occurred.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an audit event stamped with the current time.
    pub fn new(
        action: AuditAction,
        actor_id: UserId,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            action,
            actor_id,
            target_type: target_type.into(),
            target_id: target_id.into(),
            details,
            occurred_at: Utc::now(),
        }
    }
}
