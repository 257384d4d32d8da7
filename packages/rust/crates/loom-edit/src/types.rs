//! Core types for the edit pipeline.
//!
//! Defines the data structures used throughout parsing and application.

use std::fmt;

use loom_types::LineRegion;
use serde::Serialize;

/// Opening marker of a directive.
pub const HEADER_MARKER: &str = ">>LOOM_EDIT";
/// Closing marker of a directive.
pub const CLOSING_MARKER: &str = "<<LOOM_EDIT";

/// Action keyword of a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditAction {
    /// Replace lines `start..=end`.
    Replace,
    /// Insert after line `n`.
    InsertAfter,
    /// Insert before line `n`.
    InsertBefore,
    /// Delete lines `start..=end`.
    Delete,
    /// Literal replace of every occurrence.
    SearchReplace,
    /// Create a new file.
    Create,
}

impl EditAction {
    /// Wire keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "REPLACE",
            Self::InsertAfter => "INSERT_AFTER",
            Self::InsertBefore => "INSERT_BEFORE",
            Self::Delete => "DELETE",
            Self::SearchReplace => "SEARCH_REPLACE",
            Self::Create => "CREATE",
        }
    }

    /// Parse a keyword, case-insensitively.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let upper = keyword.to_ascii_uppercase();
        [
            Self::Replace,
            Self::InsertAfter,
            Self::InsertBefore,
            Self::Delete,
            Self::SearchReplace,
            Self::Create,
        ]
        .into_iter()
        .find(|action| action.as_str() == upper)
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation with its addressing data. Line numbers are 1-based inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditOp {
    /// Replace lines `start..=end` with the body.
    Replace {
        /// First line.
        start: usize,
        /// Last line.
        end: usize,
    },
    /// Insert the body after `line`.
    InsertAfter {
        /// Anchor line.
        line: usize,
    },
    /// Insert the body before `line`.
    InsertBefore {
        /// Anchor line.
        line: usize,
    },
    /// Remove lines `start..=end`.
    Delete {
        /// First line.
        start: usize,
        /// Last line.
        end: usize,
    },
    /// Replace every literal occurrence of `old` with `new`.
    SearchReplace {
        /// Text to find.
        old: String,
        /// Replacement text.
        new: String,
    },
    /// Create a new file with the body as content.
    Create,
}

impl EditOp {
    /// Action keyword of this operation.
    #[must_use]
    pub fn action(&self) -> EditAction {
        match self {
            Self::Replace { .. } => EditAction::Replace,
            Self::InsertAfter { .. } => EditAction::InsertAfter,
            Self::InsertBefore { .. } => EditAction::InsertBefore,
            Self::Delete { .. } => EditAction::Delete,
            Self::SearchReplace { .. } => EditAction::SearchReplace,
            Self::Create => EditAction::Create,
        }
    }

    /// Addressed lines in the original file, for line-based operations.
    #[must_use]
    pub fn line_range(&self) -> Option<LineRegion> {
        match *self {
            Self::Replace { start, end } | Self::Delete { start, end } => {
                Some(LineRegion::new(start, end))
            }
            Self::InsertAfter { line } | Self::InsertBefore { line } => {
                Some(LineRegion::new(line, line))
            }
            Self::SearchReplace { .. } | Self::Create => None,
        }
    }
}

/// One parsed LOOM_EDIT directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditCommand {
    /// Target path as written in the directive.
    pub path: String,
    /// Optional `v=` content hash prefix.
    pub file_hash: Option<String>,
    /// Operation.
    pub op: EditOp,
    /// Body text; one `\n`-terminated entry per body line.
    pub body: String,
}

impl EditCommand {
    /// Build a command with no hash guard.
    #[must_use]
    pub fn new(path: impl Into<String>, op: EditOp, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_hash: None,
            op,
            body: body.into(),
        }
    }

    /// Action keyword.
    #[must_use]
    pub fn action(&self) -> EditAction {
        self.op.action()
    }

    /// Short human description, e.g. `REPLACE 3-5 src/lib.rs`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.op.line_range() {
            Some(region) => format!("{} {} {}", self.action(), region, self.path),
            None => format!("{} {}", self.action(), self.path),
        }
    }
}

/// Result of applying one command to one file.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// Content before the edit; `None` when the file was created.
    pub original: Option<String>,
    /// Content after the edit.
    pub modified: String,
    /// Affected lines in the modified file (1-based).
    pub region: LineRegion,
    /// Whether the edit created the file.
    pub created: bool,
    /// Number of replaced occurrences (SEARCH_REPLACE) or 1.
    pub count: usize,
}

/// Configuration for apply operations.
#[derive(Debug, Clone, Copy)]
pub struct EditConfig {
    /// Maximum file size in bytes (default 10MB).
    pub max_file_size: u64,
    /// Compute the outcome without writing the file.
    pub dry_run: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_file_size: loom_io::DEFAULT_MAX_FILE_BYTES,
            dry_run: false,
        }
    }
}
