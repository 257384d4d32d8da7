//! Recorded undo actions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What an action did to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoKind {
    /// Existing file modified; backup holds the prior bytes.
    FileEdit,
    /// File created; undo removes it.
    FileCreate,
    /// File deleted; backup holds the prior bytes.
    FileDelete,
}

impl UndoKind {
    /// Serialized name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileEdit => "file_edit",
            Self::FileCreate => "file_create",
            Self::FileDelete => "file_delete",
        }
    }
}

impl fmt::Display for UndoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the undo history. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoAction {
    /// Unique id (UUID v4).
    pub id: String,
    /// Kind of change.
    pub kind: UndoKind,
    /// Target file.
    pub path: PathBuf,
    /// Backup file, relative to the store directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Human-readable summary, e.g. `REPLACE 3-5 src/lib.rs`.
    pub description: String,
    /// When the action was recorded.
    pub created_at: i64,
    /// When the edit landed.
    #[serde(default)]
    pub applied_at: Option<i64>,
    /// When the action was undone.
    #[serde(default)]
    pub undone_at: Option<i64>,
    /// Edit landed on disk.
    #[serde(default)]
    pub applied: bool,
    /// Action was reverted.
    #[serde(default)]
    pub undone: bool,
}

impl UndoAction {
    /// Applied and not yet undone.
    #[must_use]
    pub fn is_undoable(&self) -> bool {
        self.applied && !self.undone
    }

    /// Short status word for listings.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match (self.applied, self.undone) {
            (_, true) => "undone",
            (true, false) => "applied",
            (false, false) => "pending",
        }
    }
}
