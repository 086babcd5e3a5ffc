//! Extension packaging and installation commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use extensa_auth::{PermissionEngine, TracingAuditSink};
use extensa_core::error::AppError;
use extensa_database::DatabasePool;
use extensa_database::store::ExtensionStore;
use extensa_entity::extension::Extension;
use extensa_entity::user::Principal;
use extensa_plugin::{BuiltinModules, ExtensionLoader, LifecycleCoordinator, PackageBuilder};

use crate::output::{self, OutputFormat};

/// Arguments for extension commands
#[derive(Debug, Args)]
pub struct ExtensionArgs {
    /// Extension subcommand
    #[command(subcommand)]
    pub command: ExtensionCommand,
}

/// Extension subcommands
#[derive(Debug, Subcommand)]
pub enum ExtensionCommand {
    /// Build a package archive from a directory containing extension.toml
    Pack {
        /// Package source directory
        dir: PathBuf,
        /// Output archive path
        out: PathBuf,
    },
    /// List installed extensions
    List,
    /// Install a package archive (the extension stays disabled)
    Install {
        /// Package archive path
        archive: PathBuf,
        /// Replace an existing installation of the same name and version
        #[arg(long)]
        overwrite: bool,
    },
}

/// Extension display row for table output
#[derive(Debug, Serialize, Tabled)]
struct ExtensionRow {
    /// Extension ID
    id: i64,
    /// Name
    name: String,
    /// Version
    version: String,
    /// Type
    #[serde(rename = "type")]
    #[tabled(rename = "type")]
    extension_type: String,
    /// Status
    status: String,
    /// Enabled flag
    enabled: bool,
    /// Updated at
    updated_at: String,
}

impl From<&Extension> for ExtensionRow {
    fn from(e: &Extension) -> Self {
        Self {
            id: e.id.get(),
            name: e.name.clone(),
            version: e.version.clone(),
            extension_type: e.extension_type.to_string(),
            status: e.status.to_string(),
            enabled: e.is_enabled,
            updated_at: e.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute extension commands
pub async fn execute(
    args: &ExtensionArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ExtensionCommand::Pack { dir, out } => {
            let builder = PackageBuilder::from_dir(dir)?;
            let bytes = builder.write_to(out)?;
            output::print_success(&format!(
                "Packed {} file(s) into '{}' ({bytes} bytes)",
                builder.len(),
                out.display()
            ));
        }
        ExtensionCommand::List => {
            let config = super::load_config(config_path)?;
            let pool = super::connect(&config).await?;
            let extensions = pool.stores().extensions.list().await?;
            let rows: Vec<ExtensionRow> = extensions.iter().map(ExtensionRow::from).collect();
            output::print_list(&rows, format);
            pool.close().await;
        }
        ExtensionCommand::Install { archive, overwrite } => {
            let config = super::load_config(config_path)?;
            let pool = super::connect(&config).await?;
            let bytes = tokio::fs::read(archive).await.map_err(|e| {
                AppError::validation(format!("Cannot read '{}': {e}", archive.display()))
            })?;

            let coordinator = coordinator(&pool, &config.extensions);
            let outcome = coordinator
                .install(&Principal::system(), bytes, *overwrite)
                .await?;

            output::print_item(&ExtensionRow::from(&outcome.extension), format);
            output::print_success(&format!(
                "Installed '{}' (id: {})",
                outcome.extension.key(),
                outcome.extension.id
            ));
            if !outcome.extension.is_enabled {
                output::print_warning(
                    "The extension is disabled; enable it through the server API",
                );
            }
            pool.close().await;
        }
    }

    Ok(())
}

/// Builds a coordinator over the PostgreSQL stores with the compiled-in
/// modules, enough to validate and install packages.
fn coordinator(
    pool: &DatabasePool,
    config: &extensa_core::config::ExtensionConfig,
) -> LifecycleCoordinator {
    let stores = pool.stores();
    let audit = Arc::new(TracingAuditSink);
    let engine = Arc::new(PermissionEngine::new(
        stores.permissions.clone(),
        stores.extensions.clone(),
        audit.clone(),
    ));

    let mut builtins = BuiltinModules::new();
    extension_pages::register(&mut builtins);
    let loader = ExtensionLoader::new(builtins, stores.migrator.clone());

    LifecycleCoordinator::new(config.clone(), stores.extensions, engine, loader, audit)
}
