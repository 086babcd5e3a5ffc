//! Extension-scoped permission checks.
//!
//! These are where the permission engine meets the extension registry: a
//! check on an extension fails closed unless the extension exists and is
//! currently serving, so disabling an extension revokes effective access
//! without touching any permission row.

use tracing::debug;

use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;
use extensa_entity::extension::Extension;
use extensa_entity::permission::{EXTENSION_ENTITY, EntityRef, PermissionLevel};
use extensa_entity::user::Principal;

use super::engine::PermissionEngine;

impl PermissionEngine {
    /// Resolves the serving extension for a logical name.
    ///
    /// With several enabled versions installed, the highest semantic version
    /// wins.
    pub async fn serving_extension(&self, name: &str) -> AppResult<Option<Extension>> {
        let candidates = self.extensions.find_by_name(name).await?;
        Ok(candidates
            .into_iter()
            .filter(Extension::is_serving)
            .max_by(|a, b| a.semver().cmp(&b.semver())))
    }

    /// Checks whether a principal holds at least `required` on the extension
    /// with the given logical name.
    ///
    /// Returns `false` if no version of the extension is enabled.
    pub async fn has_extension_permission(
        &self,
        principal: &Principal,
        name: &str,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        match self.serving_extension(name).await? {
            Some(extension) => {
                self.check(principal, &EntityRef::extension(extension.id), required)
                    .await
            }
            None => {
                debug!(extension = %name, "Extension check denied: not enabled");
                Ok(false)
            }
        }
    }

    /// Checks an extension by id, failing closed unless it is serving.
    pub async fn has_extension_permission_by_id(
        &self,
        principal: &Principal,
        id: ExtensionId,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        match self.extensions.find_by_id(id).await? {
            Some(extension) if extension.is_serving() => {
                self.check(principal, &EntityRef::extension(id), required)
                    .await
            }
            _ => {
                debug!(extension_id = %id, "Extension check denied: not enabled");
                Ok(false)
            }
        }
    }

    /// Checks type-wide access on extensions, the gate for lifecycle
    /// operations.
    pub async fn has_extension_type_permission(
        &self,
        principal: &Principal,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        self.has_type_permission(principal, EXTENSION_ENTITY, required)
            .await
    }
}
