//! Health check handler.

use axum::Json;
use axum::extract::State;

use crate::dto::response::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let database = match &state.database {
        Some(pool) => match pool.health_check().await {
            Ok(true) => "connected",
            _ => "unavailable",
        },
        None => "memory",
    };
    let status = if database == "unavailable" {
        "degraded"
    } else {
        "ok"
    };

    Json(ApiResponse::ok(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database: database.to_string(),
        live_extensions: state.coordinator.live_count().await,
        mounted_routes: state.coordinator.routes().len().await,
    }))
}
