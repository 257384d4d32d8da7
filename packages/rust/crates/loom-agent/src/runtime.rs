//! Wires settings into a ready-to-use coordinator.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use loom_guard::{RollbackCoordinator, ValidationEngine};
use loom_lsp::LspManager;
use loom_undo::UndoStore;

use crate::config::RuntimeSettings;

/// Build the apply/validate/rollback pipeline for `workspace_root`.
///
/// Language servers start lazily, so this is cheap for commands that never
/// validate.
pub fn build_coordinator(
    workspace_root: &Path,
    settings: &RuntimeSettings,
) -> anyhow::Result<RollbackCoordinator> {
    let lsp = Arc::new(LspManager::new(settings.lsp_manager_config(workspace_root)));
    let guard = settings.guard_config();
    let engine = ValidationEngine::new(Some(lsp), guard.fallback_enabled)
        .with_region_buffer(guard.context_buffer_lines);

    let undo_dir = settings.undo_dir(workspace_root);
    let store = UndoStore::open(&undo_dir, settings.undo_max_entries())
        .with_context(|| format!("failed to open undo history at {}", undo_dir.display()))?;

    tracing::debug!(
        event = "loom.agent.runtime.ready",
        workspace = %workspace_root.display(),
        undo_dir = %undo_dir.display(),
        history = store.len(),
        rollback_on_error = guard.rollback_on_error,
        "coordinator ready"
    );
    Ok(RollbackCoordinator::new(workspace_root, guard, engine, store))
}
