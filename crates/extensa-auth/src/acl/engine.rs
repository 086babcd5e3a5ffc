//! The permission engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_core::types::{PermissionId, UserId};
use extensa_database::store::{ExtensionStore, PermissionStore};
use extensa_entity::audit::{AuditAction, AuditEvent};
use extensa_entity::permission::{EntityRef, NewPermission, Permission, PermissionLevel};
use extensa_entity::user::Principal;

use crate::audit::AuditSink;

/// Evaluates graded access decisions and manages permission rows.
///
/// A decision for `(principal, entity)` is the higher of the principal's
/// non-expired row on the entity and its non-expired type-wide row
/// (`entity_id = "*"`). Global admins bypass every check. Any store
/// failure is returned as an error, never as an allow.
#[derive(Debug, Clone)]
pub struct PermissionEngine {
    /// Permission rows.
    pub(crate) permissions: Arc<dyn PermissionStore>,
    /// Extension registry, consulted by extension-scoped checks.
    pub(crate) extensions: Arc<dyn ExtensionStore>,
    /// Audit collaborator.
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl PermissionEngine {
    /// Creates a new permission engine.
    pub fn new(
        permissions: Arc<dyn PermissionStore>,
        extensions: Arc<dyn ExtensionStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            permissions,
            extensions,
            audit,
        }
    }

    /// Returns the highest level a user's stored, non-expired rows confer on
    /// an entity, without the global-admin bypass.
    pub async fn stored_level(
        &self,
        user_id: UserId,
        entity: &EntityRef,
    ) -> AppResult<PermissionLevel> {
        let now = Utc::now();
        let mut level = PermissionLevel::None;

        if let Some(row) = self.permissions.find(user_id, entity).await? {
            if !row.is_expired_at(now) {
                level = level.max(row.permission_level);
            }
        }

        if !entity.is_type_wide() {
            if let Some(row) = self.permissions.find(user_id, &entity.to_type_wide()).await? {
                if !row.is_expired_at(now) {
                    level = level.max(row.permission_level);
                }
            }
        }

        Ok(level)
    }

    /// Returns the effective level of a principal on an entity (`Admin` for
    /// a global admin).
    pub async fn effective_level(
        &self,
        principal: &Principal,
        entity: &EntityRef,
    ) -> AppResult<PermissionLevel> {
        if principal.is_global_admin() {
            return Ok(PermissionLevel::Admin);
        }
        self.stored_level(principal.user_id, entity).await
    }

    /// Checks whether a principal holds at least `required` on an entity.
    pub async fn has_permission(
        &self,
        principal: &Principal,
        entity_type: &str,
        entity_id: &str,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        let entity = EntityRef::new(entity_type, entity_id);
        self.check(principal, &entity, required).await
    }

    /// Checks an entity reference.
    pub async fn check(
        &self,
        principal: &Principal,
        entity: &EntityRef,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        let level = self.effective_level(principal, entity).await?;
        let allowed = level.satisfies(required);
        debug!(
            user_id = %principal.user_id,
            entity = %entity,
            required = %required,
            effective = %level,
            allowed,
            "Permission check"
        );
        Ok(allowed)
    }

    /// Checks whether a principal holds at least `required` on every entity
    /// of a type (a type-wide row or global admin).
    pub async fn has_type_permission(
        &self,
        principal: &Principal,
        entity_type: &str,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        self.check(principal, &EntityRef::type_wide(entity_type), required)
            .await
    }

    /// Returns `FORBIDDEN` unless the principal holds at least `required`.
    pub async fn require(
        &self,
        principal: &Principal,
        entity: &EntityRef,
        required: PermissionLevel,
    ) -> AppResult<()> {
        if self.check(principal, entity, required).await? {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "'{}' requires '{required}' on {entity}",
                principal.username
            )))
        }
    }

    /// Checks another user's access on an entity on behalf of `caller`.
    ///
    /// A caller may always check themself; checking someone else requires
    /// `Admin` on the entity. The subject is evaluated from stored rows only,
    /// since only the caller's roles are known.
    pub async fn check_for(
        &self,
        caller: &Principal,
        user_id: UserId,
        entity: &EntityRef,
        required: PermissionLevel,
    ) -> AppResult<bool> {
        if caller.user_id == user_id {
            return self.check(caller, entity, required).await;
        }
        self.require(caller, entity, PermissionLevel::Admin).await?;
        Ok(self.stored_level(user_id, entity).await?.satisfies(required))
    }

    /// Grants (upserts) a permission.
    ///
    /// The grantor must be a global admin or hold `Admin` on the entity.
    /// Re-granting overwrites level, expiry, grantor and timestamp.
    pub async fn grant(
        &self,
        grantor: &Principal,
        user_id: UserId,
        entity: EntityRef,
        level: PermissionLevel,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Permission> {
        if entity.entity_type.trim().is_empty() || entity.entity_id.trim().is_empty() {
            return Err(AppError::validation(
                "Entity type and entity id must not be empty",
            ));
        }
        if let Some(expiry) = expires_at {
            if expiry <= Utc::now() {
                return Err(AppError::validation("Expiry must be in the future"));
            }
        }

        self.require(grantor, &entity, PermissionLevel::Admin).await?;

        let row = self
            .permissions
            .upsert(&NewPermission {
                user_id,
                entity: entity.clone(),
                level,
                granted_by: grantor.user_id,
                expires_at,
            })
            .await?;

        info!(
            permission_id = %row.id,
            user_id = %user_id,
            entity = %entity,
            level = %level,
            granted_by = %grantor.user_id,
            "Permission granted"
        );

        self.audit.record(AuditEvent::new(
            AuditAction::PermissionGranted,
            grantor.user_id,
            entity.entity_type.clone(),
            entity.entity_id.clone(),
            json!({
                "permission_id": row.id,
                "user_id": user_id,
                "level": level,
                "expires_at": expires_at,
            }),
        ));

        Ok(row)
    }

    /// Revokes a permission row.
    ///
    /// `NOT_FOUND` if the row does not exist, then `FORBIDDEN` unless the
    /// revoker holds `Admin` on the row's entity.
    pub async fn revoke(&self, revoker: &Principal, id: PermissionId) -> AppResult<Permission> {
        let row = self
            .permissions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permission {id} not found")))?;

        let entity = row.entity();
        self.require(revoker, &entity, PermissionLevel::Admin).await?;

        if !self.permissions.delete(id).await? {
            return Err(AppError::not_found(format!("Permission {id} not found")));
        }

        info!(
            permission_id = %id,
            user_id = %row.user_id,
            entity = %entity,
            revoked_by = %revoker.user_id,
            "Permission revoked"
        );

        self.audit.record(AuditEvent::new(
            AuditAction::PermissionRevoked,
            revoker.user_id,
            entity.entity_type.clone(),
            entity.entity_id.clone(),
            json!({
                "permission_id": id,
                "user_id": row.user_id,
                "level": row.permission_level,
            }),
        ));

        Ok(row)
    }

    /// Lists every row on an entity. Requires `Admin` on the entity.
    pub async fn list_for_entity(
        &self,
        caller: &Principal,
        entity: &EntityRef,
    ) -> AppResult<Vec<Permission>> {
        self.require(caller, entity, PermissionLevel::Admin).await?;
        self.permissions.list_for_entity(entity).await
    }

    /// Lists every row held by a user. Allowed for the user themself or a
    /// global admin.
    pub async fn list_for_principal(
        &self,
        caller: &Principal,
        user_id: UserId,
    ) -> AppResult<Vec<Permission>> {
        if caller.user_id != user_id && !caller.is_global_admin() {
            return Err(AppError::forbidden(format!(
                "'{}' may not list permissions of another principal",
                caller.username
            )));
        }
        self.permissions.list_for_user(user_id).await
    }

    /// Counts the rows on an entity.
    pub async fn count_for_entity(&self, entity: &EntityRef) -> AppResult<u64> {
        self.permissions.count_for_entity(entity).await
    }

    /// Deletes every row on an entity as part of the entity's removal.
    ///
    /// Authorization is the caller's responsibility.
    pub async fn purge_entity(&self, actor: &Principal, entity: &EntityRef) -> AppResult<u64> {
        let removed = self.permissions.delete_for_entity(entity).await?;
        if removed > 0 {
            info!(entity = %entity, removed, "Permissions purged with entity");
            self.audit.record(AuditEvent::new(
                AuditAction::PermissionRevoked,
                actor.user_id,
                entity.entity_type.clone(),
                entity.entity_id.clone(),
                json!({ "cascade": true, "removed": removed }),
            ));
        }
        Ok(removed)
    }
}
