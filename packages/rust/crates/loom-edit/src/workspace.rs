//! Workspace-relative path resolution.

use std::path::{Component, Path, PathBuf};

use crate::error::EditError;

/// Resolve a directive path against `root` and reject anything that lands
/// outside it. Resolution is lexical: the target may not exist yet, and
/// `..` segments are folded without touching the filesystem.
///
/// # Errors
/// `OutsideWorkspace` when the resolved path is not under `root`.
pub fn resolve_in_workspace(root: &Path, path: &str) -> Result<PathBuf, EditError> {
    let root = lexical_normalize(root)
        .ok_or_else(|| EditError::OutsideWorkspace(root.display().to_string()))?;
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    match lexical_normalize(&joined) {
        Some(resolved) if resolved.starts_with(&root) => Ok(resolved),
        _ => {
            tracing::warn!(
                event = "loom.edit.path.outside_workspace",
                path,
                root = %root.display(),
                "rejected path outside workspace"
            );
            Err(EditError::OutsideWorkspace(path.to_string()))
        }
    }
}

/// Fold `.` and `..` components. `None` when `..` climbs above the root of
/// a relative path.
fn lexical_normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => return None,
            },
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}
