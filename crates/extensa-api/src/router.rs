//! Route definitions for the Extensa HTTP API.
//!
//! Management routes live under `/api`; everything under `/extensions` is
//! forwarded to the runtime route table.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{any, delete, get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Headroom over the package size limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the Axum router with all routes and request logging.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.coordinator.config().max_package_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(extension_routes())
        .merge(permission_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/extensions/{*path}", any(handlers::dispatch::dispatch))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Extension lifecycle endpoints
fn extension_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/extensions",
            get(handlers::extension::list_extensions).post(handlers::extension::install_extension),
        )
        .route(
            "/extensions/{reference}",
            get(handlers::extension::get_extension).delete(handlers::extension::uninstall_extension),
        )
        .route(
            "/extensions/{reference}/enable",
            post(handlers::extension::enable_extension),
        )
        .route(
            "/extensions/{reference}/disable",
            post(handlers::extension::disable_extension),
        )
        .route(
            "/extensions/by-name/{name}/access",
            get(handlers::extension::extension_access),
        )
}

/// Permission grant, revoke, listing and check endpoints
fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/permissions", post(handlers::permission::grant_permission))
        .route("/permissions/check", get(handlers::permission::check_permission))
        .route("/permissions/{id}", delete(handlers::permission::revoke_permission))
        .route(
            "/permissions/entity/{entity_type}/{entity_id}",
            get(handlers::permission::list_entity_permissions),
        )
        .route(
            "/permissions/user/{user_id}",
            get(handlers::permission::list_user_permissions),
        )
}
