//! Forwarding of `/extensions/*` requests into the runtime route table.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use extensa_core::AppError;
use extensa_entity::permission::PermissionLevel;

use crate::error::ApiError;
use crate::state::AppState;

/// ANY /extensions/{*path}
///
/// With route gating on, the caller needs `view` on the owning extension.
pub async fn dispatch(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let routes = state.coordinator.routes();
    let Some(matched) = routes.resolve(request.uri().path()).await else {
        debug!(path = %request.uri().path(), "No extension mounted for path");
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    if state.coordinator.config().gate_routes {
        let principal = state
            .resolver
            .resolve(request.headers())
            .await?
            .ok_or_else(|| AppError::unauthenticated("Request carries no principal"))?;
        let allowed = state
            .engine
            .has_extension_permission_by_id(&principal, matched.owner, PermissionLevel::View)
            .await?;
        if !allowed {
            return Err(AppError::forbidden(format!(
                "'{}' may not access extension {}",
                principal.username, matched.owner
            ))
            .into());
        }
    }

    Ok(matched.call(request).await)
}
