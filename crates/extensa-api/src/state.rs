//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use extensa_auth::PermissionEngine;
use extensa_database::DatabasePool;
use extensa_plugin::LifecycleCoordinator;

use crate::extractors::PrincipalResolver;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. All fields are
/// `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Extensions ───────────────────────────────────────────
    /// Lifecycle coordinator; also owns the extension route table
    pub coordinator: Arc<LifecycleCoordinator>,

    // ── Auth ─────────────────────────────────────────────────
    /// Permission engine
    pub engine: Arc<PermissionEngine>,
    /// Resolves the calling principal from request headers
    pub resolver: Arc<dyn PrincipalResolver>,

    // ── Infrastructure ───────────────────────────────────────
    /// PostgreSQL pool, absent when running on in-memory stores
    pub database: Option<DatabasePool>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state.
    pub fn new(
        coordinator: Arc<LifecycleCoordinator>,
        resolver: Arc<dyn PrincipalResolver>,
        database: Option<DatabasePool>,
    ) -> Self {
        Self {
            engine: Arc::clone(coordinator.engine()),
            coordinator,
            resolver,
            database,
            started_at: Instant::now(),
        }
    }
}
