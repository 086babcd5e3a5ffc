//! Permission management handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use extensa_entity::permission::{EntityRef, Permission, PermissionLevel};

use crate::dto::request::{CheckQuery, GrantPermissionRequest, validated};
use crate::dto::response::{ApiResponse, CheckResponse};
use crate::error::ApiError;
use crate::extractors::AuthPrincipal;
use crate::extractors::path::{parse_permission_id, parse_user_id};
use crate::state::AppState;

/// POST /api/permissions
pub async fn grant_permission(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Json(req): Json<GrantPermissionRequest>,
) -> Result<Json<ApiResponse<Permission>>, ApiError> {
    let req = validated(req)?;
    let level: PermissionLevel = req.level.parse()?;
    let permission = state
        .engine
        .grant(
            &auth,
            req.user_id.into(),
            EntityRef::new(req.entity_type, req.entity_id),
            level,
            req.expires_at,
        )
        .await?;
    Ok(Json(ApiResponse::ok(permission)))
}

/// DELETE /api/permissions/{id}
pub async fn revoke_permission(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Permission>>, ApiError> {
    let id = parse_permission_id(&id)?;
    let revoked = state.engine.revoke(&auth, id).await?;
    Ok(Json(ApiResponse::ok(revoked)))
}

/// GET /api/permissions/entity/{type}/{id}
pub async fn list_entity_permissions(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<Vec<Permission>>>, ApiError> {
    let entity = EntityRef::new(entity_type, entity_id);
    let rows = state.engine.list_for_entity(&auth, &entity).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/permissions/user/{user_id}
pub async fn list_user_permissions(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Permission>>>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let rows = state.engine.list_for_principal(&auth, user_id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// GET /api/permissions/check?user_id&entity_type&entity_id&level
pub async fn check_permission(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<CheckQuery>,
) -> Result<Json<ApiResponse<CheckResponse>>, ApiError> {
    let query = validated(query)?;
    let level: PermissionLevel = query.level.parse()?;
    let user_id = query.user_id.map(Into::into).unwrap_or(auth.user_id);
    let entity = EntityRef::new(query.entity_type, query.entity_id);

    let allowed = state.engine.check_for(&auth, user_id, &entity, level).await?;
    Ok(Json(ApiResponse::ok(CheckResponse {
        user_id,
        entity_type: entity.entity_type,
        entity_id: entity.entity_id,
        level,
        allowed,
    })))
}
