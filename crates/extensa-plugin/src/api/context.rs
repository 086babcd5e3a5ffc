//! Module context: what a running extension may use from the host.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use extensa_core::types::ExtensionId;

/// Context passed to an extension's route and lifecycle hooks.
///
/// Background tasks spawned through the context are cancelled and aborted
/// when the extension is disabled.
#[derive(Clone)]
pub struct ModuleContext {
    /// Extension id.
    pub extension_id: ExtensionId,
    /// `name_version` key.
    pub key: String,
    /// Absolute base path the extension's route groups are mounted under.
    pub mount_base: String,
    /// Cancelled on disable.
    token: CancellationToken,
    /// Tasks spawned by the extension.
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("extension_id", &self.extension_id)
            .field("key", &self.key)
            .field("mount_base", &self.mount_base)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl ModuleContext {
    /// Creates a context for an extension.
    pub fn new(
        extension_id: ExtensionId,
        key: impl Into<String>,
        mount_base: impl Into<String>,
    ) -> Self {
        Self {
            extension_id,
            key: key.into(),
            mount_base: mount_base.into(),
            token: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a child token cancelled when the extension is disabled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Returns whether the extension is being torn down.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns a background task owned by the extension.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = future => {}
            }
        });
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(handle);
        }
    }

    /// Returns the number of tasks still running.
    pub fn running_tasks(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Cancels the token and aborts every spawned task.
    pub fn shutdown(&self) {
        self.token.cancel();
        let drained: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let count = drained.len();
        for task in drained {
            task.abort();
        }
        debug!(extension_id = %self.extension_id, tasks = count, "Module context shut down");
    }
}
