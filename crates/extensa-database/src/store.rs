//! Store traits for the permission engine and the extension registry.
//!
//! Both the PostgreSQL repositories and the in-memory stores implement
//! these traits; callers hold them as `Arc<dyn ...>`.

use async_trait::async_trait;

use extensa_core::result::AppResult;
use extensa_core::types::{ExtensionId, PermissionId, UserId};
use extensa_entity::extension::{
    Extension, ExtensionRef, ExtensionStatus, NewExtension, SchemaMigration,
};
use extensa_entity::permission::{EntityRef, NewPermission, Permission};

/// Persistent mapping of `(principal, entity type, entity id)` to a graded
/// level.
///
/// Implementations must keep at most one row per tuple; `upsert` overwrites
/// level, expiry, grantor and timestamp of an existing row and keeps its id.
#[async_trait]
pub trait PermissionStore: Send + Sync + std::fmt::Debug {
    /// Find the row for a principal on an entity, expired or not.
    async fn find(&self, user_id: UserId, entity: &EntityRef) -> AppResult<Option<Permission>>;

    /// Find a row by id.
    async fn find_by_id(&self, id: PermissionId) -> AppResult<Option<Permission>>;

    /// Insert or overwrite the row for `(user, entity)`.
    async fn upsert(&self, grant: &NewPermission) -> AppResult<Permission>;

    /// Delete a row by id. Returns `false` if no row existed.
    async fn delete(&self, id: PermissionId) -> AppResult<bool>;

    /// List every row on an entity.
    async fn list_for_entity(&self, entity: &EntityRef) -> AppResult<Vec<Permission>>;

    /// List every row held by a principal.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>>;

    /// Count the rows on an entity.
    async fn count_for_entity(&self, entity: &EntityRef) -> AppResult<u64>;

    /// Delete every row on an entity. Returns the number removed.
    async fn delete_for_entity(&self, entity: &EntityRef) -> AppResult<u64>;
}

/// Persistent catalog of installed extensions.
///
/// `(name, version)` is unique; `insert` reports `CONFLICT` on violation.
#[async_trait]
pub trait ExtensionStore: Send + Sync + std::fmt::Debug {
    /// Insert a new row.
    async fn insert(&self, new: &NewExtension) -> AppResult<Extension>;

    /// Find a row by id.
    async fn find_by_id(&self, id: ExtensionId) -> AppResult<Option<Extension>>;

    /// Find a row by its `(name, version)` key.
    async fn find_by_key(&self, name: &str, version: &str) -> AppResult<Option<Extension>>;

    /// Find every installed version of a logical name.
    async fn find_by_name(&self, name: &str) -> AppResult<Vec<Extension>>;

    /// List every row ordered by id.
    async fn list(&self) -> AppResult<Vec<Extension>>;

    /// Persist a status and enabled flag. `NOT_FOUND` if the row is gone.
    async fn update_state(
        &self,
        id: ExtensionId,
        status: ExtensionStatus,
        is_enabled: bool,
    ) -> AppResult<Extension>;

    /// Replace the manifest, location and status of an existing row,
    /// keeping its id. `NOT_FOUND` if the row is gone.
    async fn replace(&self, id: ExtensionId, new: &NewExtension) -> AppResult<Extension>;

    /// Delete a row. Returns `false` if no row existed.
    async fn delete(&self, id: ExtensionId) -> AppResult<bool>;

    /// Resolve a reference by id or key.
    async fn resolve(&self, reference: &ExtensionRef) -> AppResult<Option<Extension>> {
        match reference {
            ExtensionRef::Id(id) => self.find_by_id(*id).await,
            ExtensionRef::Key { name, version } => self.find_by_key(name, version).await,
        }
    }
}

/// Applies extension schema contributions to the persistent store.
#[async_trait]
pub trait SchemaMigrator: Send + Sync + std::fmt::Debug {
    /// Apply every migration of `owner` not yet recorded, in order.
    ///
    /// Returns the number of migrations executed. Failures are
    /// `SCHEMA_ERROR`.
    async fn apply(&self, owner: &str, migrations: &[SchemaMigration]) -> AppResult<usize>;
}
