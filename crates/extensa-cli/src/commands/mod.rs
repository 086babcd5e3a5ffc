//! CLI command definitions and dispatch.

pub mod extension;
pub mod migrate;
pub mod permission;

use clap::{Parser, Subcommand};

use extensa_core::config::AppConfig;
use extensa_core::error::AppError;
use extensa_database::DatabasePool;

use crate::output::OutputFormat;

/// Extensa: extension lifecycle and permission administration
#[derive(Debug, Parser)]
#[command(name = "extensa", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Extension packaging and installation
    Extension(extension::ExtensionArgs),
    /// Permission management
    Permission(permission::PermissionArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Extension(args) => {
                extension::execute(args, &self.config, self.format).await
            }
            Commands::Permission(args) => {
                permission::execute(args, &self.config, self.format).await
            }
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load_file(config_path)
}

/// Helper: connect to the database described by the configuration
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}
