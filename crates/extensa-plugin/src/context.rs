//! Runtime context of an enabled extension.

use std::sync::Arc;

use extensa_core::types::ExtensionId;

use crate::api::context::ModuleContext;
use crate::handle::ModuleHandle;

/// Process-local state of one enabled extension.
///
/// Exists only between a successful enable and the matching disable (or
/// process shutdown). Never persisted; the durable registry row is looked up
/// by id when needed.
#[derive(Debug)]
pub struct ExtensionContext {
    /// Owning extension.
    pub extension_id: ExtensionId,
    /// `name_version` key.
    pub key: String,
    /// Loaded module handle.
    pub handle: Arc<ModuleHandle>,
    /// Mount prefixes in the order they were mounted.
    pub mounted: Vec<String>,
    /// Context handed to the module's hooks.
    pub module_ctx: ModuleContext,
}

impl ExtensionContext {
    /// Creates a context for a freshly activated extension.
    pub fn new(handle: Arc<ModuleHandle>, mounted: Vec<String>, module_ctx: ModuleContext) -> Self {
        Self {
            extension_id: handle.extension_id,
            key: handle.key(),
            handle,
            mounted,
            module_ctx,
        }
    }
}
