//! Extension lifecycle handlers.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};

use extensa_core::AppError;
use extensa_entity::permission::PermissionLevel;

use crate::dto::request::{AccessQuery, InstallQuery, UninstallQuery};
use crate::dto::response::{AccessResponse, ApiResponse, ExtensionResponse, LifecycleResponse};
use crate::error::ApiError;
use crate::extractors::AuthPrincipal;
use crate::extractors::path::parse_extension_ref;
use crate::state::AppState;

/// Name of the multipart field carrying the package archive.
pub const PACKAGE_FIELD: &str = "package";

/// GET /api/extensions
pub async fn list_extensions(
    State(state): State<AppState>,
    auth: AuthPrincipal,
) -> Result<Json<ApiResponse<Vec<ExtensionResponse>>>, ApiError> {
    let extensions = state.coordinator.list(&auth).await?;
    Ok(Json(ApiResponse::ok(
        extensions.into_iter().map(ExtensionResponse::from).collect(),
    )))
}

/// GET /api/extensions/{ref}
pub async fn get_extension(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<ExtensionResponse>>, ApiError> {
    let reference = parse_extension_ref(&reference)?;
    let extension = state.coordinator.get(&auth, &reference).await?;
    Ok(Json(ApiResponse::ok(extension.into())))
}

/// POST /api/extensions (multipart, field `package`)
pub async fn install_extension(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Query(query): Query<InstallQuery>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<LifecycleResponse>>, ApiError> {
    let mut archive: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some(PACKAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read package: {e}")))?;
            archive = Some(bytes.to_vec());
        }
    }
    let archive = archive.ok_or_else(|| {
        AppError::validation(format!("Multipart field '{PACKAGE_FIELD}' is required"))
    })?;

    let outcome = state
        .coordinator
        .install(&auth, archive, query.overwrite)
        .await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// POST /api/extensions/{ref}/enable
pub async fn enable_extension(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<LifecycleResponse>>, ApiError> {
    let reference = parse_extension_ref(&reference)?;
    let outcome = state.coordinator.enable(&auth, &reference).await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// POST /api/extensions/{ref}/disable
pub async fn disable_extension(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(reference): Path<String>,
) -> Result<Json<ApiResponse<LifecycleResponse>>, ApiError> {
    let reference = parse_extension_ref(&reference)?;
    let outcome = state.coordinator.disable(&auth, &reference).await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// DELETE /api/extensions/{ref}?cascade=bool
pub async fn uninstall_extension(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(reference): Path<String>,
    Query(query): Query<UninstallQuery>,
) -> Result<Json<ApiResponse<LifecycleResponse>>, ApiError> {
    let reference = parse_extension_ref(&reference)?;
    let outcome = state
        .coordinator
        .uninstall(&auth, &reference, query.cascade)
        .await?;
    Ok(Json(ApiResponse::ok(outcome.into())))
}

/// GET /api/extensions/by-name/{name}/access?level=view
///
/// Answers for the caller only.
pub async fn extension_access(
    State(state): State<AppState>,
    auth: AuthPrincipal,
    Path(name): Path<String>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<ApiResponse<AccessResponse>>, ApiError> {
    let level = match query.level.as_deref() {
        Some(raw) => raw.parse::<PermissionLevel>()?,
        None => PermissionLevel::View,
    };
    let allowed = state
        .engine
        .has_extension_permission(&auth, &name, level)
        .await?;
    Ok(Json(ApiResponse::ok(AccessResponse {
        name,
        level,
        allowed,
    })))
}
