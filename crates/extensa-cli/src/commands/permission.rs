//! Permission management commands.
//!
//! Commands run as the system principal; the operator's shell access is the
//! authorization.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use extensa_auth::{PermissionEngine, TracingAuditSink};
use extensa_core::error::AppError;
use extensa_core::types::{PermissionId, UserId};
use extensa_entity::permission::{EntityRef, Permission, PermissionLevel};
use extensa_entity::user::Principal;

use crate::output::{self, OutputFormat};

/// Arguments for permission commands
#[derive(Debug, Args)]
pub struct PermissionArgs {
    /// Permission subcommand
    #[command(subcommand)]
    pub command: PermissionCommand,
}

/// Permission subcommands
#[derive(Debug, Subcommand)]
pub enum PermissionCommand {
    /// Grant (or re-grant) a permission
    Grant {
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Entity type, e.g. `extension`
        #[arg(long)]
        entity_type: String,
        /// Entity ID, or `*` for every entity of the type
        #[arg(long)]
        entity_id: String,
        /// Level: none, view, edit, delete, admin
        #[arg(long)]
        level: String,
        /// Expiry as an RFC 3339 timestamp
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Revoke a permission by ID
    Revoke {
        /// Permission ID
        id: PermissionId,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// List permissions held by a user or set on an entity
    List {
        /// User ID
        #[arg(long, conflicts_with_all = ["entity_type", "entity_id"])]
        user: Option<UserId>,
        /// Entity type
        #[arg(long, requires = "entity_id")]
        entity_type: Option<String>,
        /// Entity ID
        #[arg(long, requires = "entity_type")]
        entity_id: Option<String>,
    },
    /// Check a user's stored access on an entity
    Check {
        /// User ID
        #[arg(long)]
        user: UserId,
        /// Entity type
        #[arg(long)]
        entity_type: String,
        /// Entity ID
        #[arg(long)]
        entity_id: String,
        /// Required level
        #[arg(long, default_value = "view")]
        level: String,
    },
}

/// Permission display row for table output
#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    /// Permission ID
    id: String,
    /// User ID
    user_id: String,
    /// Entity
    entity: String,
    /// Level
    level: String,
    /// Granted at
    granted_at: String,
    /// Expires at
    expires_at: String,
}

impl From<&Permission> for PermissionRow {
    fn from(p: &Permission) -> Self {
        Self {
            id: p.id.to_string(),
            user_id: p.user_id.to_string(),
            entity: p.entity().to_string(),
            level: p.permission_level.to_string(),
            granted_at: p.granted_at.format("%Y-%m-%d %H:%M").to_string(),
            expires_at: p
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}

/// Check result row
#[derive(Debug, Serialize, Tabled)]
struct CheckRow {
    /// User ID
    user_id: String,
    /// Entity
    entity: String,
    /// Required level
    required: String,
    /// Stored level
    held: String,
    /// Decision
    allowed: bool,
}

/// Execute permission commands
pub async fn execute(
    args: &PermissionArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::connect(&config).await?;
    let stores = pool.stores();
    let engine = PermissionEngine::new(
        stores.permissions,
        stores.extensions,
        Arc::new(TracingAuditSink),
    );
    let operator = Principal::system();

    match &args.command {
        PermissionCommand::Grant {
            user,
            entity_type,
            entity_id,
            level,
            expires_at,
        } => {
            let level: PermissionLevel = level.parse()?;
            let row = engine
                .grant(
                    &operator,
                    *user,
                    EntityRef::new(entity_type, entity_id),
                    level,
                    *expires_at,
                )
                .await?;
            output::print_item(&PermissionRow::from(&row), format);
            output::print_success(&format!("Granted {level} to {user} on {}", row.entity()));
        }
        PermissionCommand::Revoke { id, yes } => {
            if !yes {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Revoke permission {id}?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    pool.close().await;
                    return Ok(());
                }
            }

            let row = engine.revoke(&operator, *id).await?;
            output::print_success(&format!(
                "Revoked {} from {} on {}",
                row.permission_level,
                row.user_id,
                row.entity()
            ));
        }
        PermissionCommand::List {
            user,
            entity_type,
            entity_id,
        } => {
            let rows = match (user, entity_type, entity_id) {
                (Some(user), _, _) => engine.list_for_principal(&operator, *user).await?,
                (None, Some(entity_type), Some(entity_id)) => {
                    engine
                        .list_for_entity(&operator, &EntityRef::new(entity_type, entity_id))
                        .await?
                }
                _ => {
                    return Err(AppError::validation(
                        "Pass --user, or --entity-type with --entity-id",
                    ));
                }
            };
            let rows: Vec<PermissionRow> = rows.iter().map(PermissionRow::from).collect();
            output::print_list(&rows, format);
        }
        PermissionCommand::Check {
            user,
            entity_type,
            entity_id,
            level,
        } => {
            let required: PermissionLevel = level.parse()?;
            let entity = EntityRef::new(entity_type, entity_id);
            let held = engine.stored_level(*user, &entity).await?;
            output::print_item(
                &CheckRow {
                    user_id: user.to_string(),
                    entity: entity.to_string(),
                    required: required.to_string(),
                    held: held.to_string(),
                    allowed: held.satisfies(required),
                },
                format,
            );
        }
    }

    pool.close().await;
    Ok(())
}
