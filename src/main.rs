//! Extensa Server: extension lifecycle manager and entity permission engine.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt};

use extensa_api::{AppState, HeaderPrincipalResolver, build_app};
use extensa_auth::{PermissionEngine, TracingAuditSink};
use extensa_core::config::AppConfig;
use extensa_database::DatabasePool;
use extensa_plugin::{BuiltinModules, ExtensionLoader, LifecycleCoordinator};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e:#}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("EXTENSA_CONFIG") {
        Ok(path) => AppConfig::load_file(&path)
            .with_context(|| format!("Config load error for '{path}'"))?,
        Err(_) => {
            let env =
                std::env::var("EXTENSA_ENV").unwrap_or_else(|_| "development".to_string());
            AppConfig::load(&env).with_context(|| format!("Config load error (env: {env})"))?
        }
    };
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Extensa v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Extension directories ────────────────────────────
    tokio::fs::create_dir_all(config.extensions.staging_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create extension root '{}'",
                config.extensions.root_dir.display()
            )
        })?;

    // ── Step 2: Database connection + migrations ─────────────────
    let pool = DatabasePool::connect(&config.database)
        .await
        .context("Database connection failed")?;

    tracing::info!("Running database migrations...");
    pool.migrate().await.context("Migration failed")?;
    tracing::info!("Database migrations complete");

    // ── Step 3: Stores and permission engine ─────────────────────
    let stores = pool.stores();
    let audit = Arc::new(TracingAuditSink);
    let engine = Arc::new(PermissionEngine::new(
        stores.permissions.clone(),
        stores.extensions.clone(),
        audit.clone(),
    ));

    // ── Step 4: Extension loader and lifecycle coordinator ───────
    let mut builtins = BuiltinModules::new();
    extension_pages::register(&mut builtins);
    tracing::info!(entrypoints = ?builtins.entrypoints(), "Compiled-in modules registered");

    let loader = ExtensionLoader::new(builtins, stores.migrator.clone());
    let coordinator = Arc::new(LifecycleCoordinator::new(
        config.extensions.clone(),
        stores.extensions.clone(),
        engine,
        loader,
        audit,
    ));

    // ── Step 5: Restore enabled extensions ───────────────────────
    if config.extensions.restore_on_startup {
        let report = coordinator
            .restore()
            .await
            .context("Extension restore failed")?;
        tracing::info!(
            enabled = report.enabled,
            failed = report.failed,
            marked_broken = report.marked_broken,
            "Extensions restored"
        );
    } else {
        tracing::info!("Extension restore on startup disabled");
    }

    // ── Step 6: Build and start HTTP server ──────────────────────
    let resolver = Arc::new(HeaderPrincipalResolver::new(config.auth.clone()));
    let state = AppState::new(Arc::clone(&coordinator), resolver, Some(pool.clone()));
    let app = build_app(state, &config.server);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Extensa server listening on {addr}");

    // ── Step 7: Graceful shutdown ────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown...");
        })
        .await
        .context("Server error")?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    if tokio::time::timeout(grace, coordinator.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("Extension shutdown exceeded the grace period");
    }
    pool.close().await;

    tracing::info!("Extensa server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
