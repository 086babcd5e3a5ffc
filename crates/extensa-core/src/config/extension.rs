//! Extension lifecycle configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Settings for the extension lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Directory holding unpacked extension packages.
    pub root_dir: PathBuf,
    /// Upper bound for a single lifecycle operation, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,
    /// Maximum accepted archive size, and maximum unpacked size, in bytes.
    #[serde(default = "default_max_package_bytes")]
    pub max_package_bytes: u64,
    /// Re-enable extensions whose durable flag is set when the server starts.
    #[serde(default = "default_true")]
    pub restore_on_startup: bool,
    /// Require `view` access on the extension to reach its mounted routes.
    #[serde(default = "default_true")]
    pub gate_routes: bool,
}

impl ExtensionConfig {
    /// Create a configuration rooted at `root_dir` with default limits.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            operation_timeout_seconds: default_operation_timeout(),
            max_package_bytes: default_max_package_bytes(),
            restore_on_startup: true,
            gate_routes: true,
        }
    }

    /// Return the operation timeout as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }

    /// Return the staging directory used while installing packages.
    pub fn staging_dir(&self) -> PathBuf {
        self.root_dir.join(".staging")
    }

    /// Return the root directory.
    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Validate the section.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.root_dir.as_os_str().is_empty() {
            return Err(AppError::configuration("extensions.root_dir must be set"));
        }
        if self.operation_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "extensions.operation_timeout_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_operation_timeout() -> u64 {
    30
}

fn default_max_package_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_true() -> bool {
    true
}
