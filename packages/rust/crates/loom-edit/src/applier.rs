//! Line-addressed patch application.
//!
//! All line arithmetic happens on `\n`-normalized text. The rewritten file
//! keeps the original terminator style and trailing-newline state. Range
//! checks run before anything touches the disk.

use std::path::Path;

use loom_io::{IoError, NormalizedText, atomic_write_text, normalize_line_endings, read_text_strict};
use loom_types::LineRegion;

use crate::error::EditError;
use crate::types::{ApplyOutcome, EditCommand, EditConfig, EditOp};

/// Applies parsed [`EditCommand`]s to files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchApplier;

impl PatchApplier {
    /// Apply `cmd` to the file at `path` and write the result atomically.
    ///
    /// CREATE writes the body verbatim and fails when the path exists.
    /// REPLACE on a missing file creates it from the body. Other operations
    /// require an existing file.
    ///
    /// # Errors
    /// Range, search and I/O failures, including `InvalidUtf8` for files that
    /// cannot be rewritten byte-for-byte. The file is left untouched on error.
    pub fn apply(
        path: &Path,
        cmd: &EditCommand,
        config: &EditConfig,
    ) -> Result<ApplyOutcome, EditError> {
        let exists = path.exists();

        match (&cmd.op, exists) {
            (EditOp::Create, true) => Err(EditError::AlreadyExists(cmd.path.clone())),
            (EditOp::Create | EditOp::Replace { .. }, false) => {
                if matches!(cmd.op, EditOp::Replace { .. }) {
                    tracing::warn!(
                        event = "loom.edit.apply.replace_creates",
                        path = %path.display(),
                        "REPLACE target missing; creating file from body"
                    );
                }
                let outcome = Self::create_outcome(&cmd.body);
                if !config.dry_run {
                    atomic_write_text(path, &outcome.modified)?;
                }
                tracing::info!(
                    event = "loom.edit.apply.created",
                    path = %path.display(),
                    bytes = outcome.modified.len(),
                    dry_run = config.dry_run,
                    "file created"
                );
                Ok(outcome)
            }
            (_, false) => Err(IoError::NotFound(path.display().to_string()).into()),
            (_, true) => {
                let original = read_text_strict(path, config.max_file_size)?;
                let (modified, region, count) = Self::apply_to_text(&original, cmd)?;
                if !config.dry_run {
                    atomic_write_text(path, &modified)?;
                }
                tracing::info!(
                    event = "loom.edit.apply.done",
                    path = %path.display(),
                    action = %cmd.action(),
                    region = %region,
                    count,
                    dry_run = config.dry_run,
                    "edit applied"
                );
                Ok(ApplyOutcome {
                    original: Some(original),
                    modified,
                    region,
                    created: false,
                    count,
                })
            }
        }
    }

    /// Apply `cmd` to in-memory text. Returns the new text, the affected
    /// region in the new text, and the occurrence count.
    ///
    /// # Errors
    /// Range and search failures. CREATE always fails here since the text
    /// already exists.
    pub fn apply_to_text(
        original: &str,
        cmd: &EditCommand,
    ) -> Result<(String, LineRegion, usize), EditError> {
        let doc = NormalizedText::new(original);
        let body = normalize_line_endings(&cmd.body);
        let body_lines = body_lines(&body);
        let mut lines = doc.lines();
        let line_count = lines.len();

        let region = match &cmd.op {
            EditOp::Replace { start, end } => {
                let (start, end) = (*start, *end);
                check_range(start, end, line_count)?;
                lines.splice(start - 1..end, body_lines.iter().copied());
                span(start, body_lines.len())
            }
            EditOp::InsertAfter { line } => {
                check_line(*line, line_count)?;
                lines.splice(*line..*line, body_lines.iter().copied());
                span(line + 1, body_lines.len())
            }
            EditOp::InsertBefore { line } => {
                check_line(*line, line_count)?;
                lines.splice(line - 1..line - 1, body_lines.iter().copied());
                span(*line, body_lines.len())
            }
            EditOp::Delete { start, end } => {
                let (start, end) = (*start, *end);
                check_range(start, end, line_count)?;
                lines.drain(start - 1..end);
                let anchor = start.min(lines.len()).max(1);
                LineRegion::new(anchor, anchor)
            }
            EditOp::SearchReplace { old, new } => {
                return search_replace(&doc, old, new);
            }
            EditOp::Create => return Err(EditError::AlreadyExists(cmd.path.clone())),
        };

        Ok((doc.render(&lines), region, 1))
    }

    fn create_outcome(body: &str) -> ApplyOutcome {
        let line_count = NormalizedText::new(body).line_count().max(1);
        ApplyOutcome {
            original: None,
            modified: body.to_string(),
            region: LineRegion::new(1, line_count),
            created: true,
            count: 1,
        }
    }
}

/// Split a body into lines. Each body line is `\n`-terminated, so one
/// trailing terminator is dropped first; an empty body has no lines.
fn body_lines(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return Vec::new();
    }
    body.strip_suffix('\n').unwrap_or(body).split('\n').collect()
}

/// Region covering `len` lines starting at `start`; a point when `len` is 0.
fn span(start: usize, len: usize) -> LineRegion {
    LineRegion::new(start, start + len.max(1) - 1)
}

fn check_line(line: usize, line_count: usize) -> Result<(), EditError> {
    if line == 0 || line > line_count {
        return Err(EditError::LineOutOfRange { line, line_count });
    }
    Ok(())
}

fn check_range(start: usize, end: usize, line_count: usize) -> Result<(), EditError> {
    if start == 0 || end < start || end > line_count {
        return Err(EditError::RangeOutOfBounds {
            start,
            end,
            line_count,
        });
    }
    Ok(())
}

fn search_replace(
    doc: &NormalizedText,
    old: &str,
    new: &str,
) -> Result<(String, LineRegion, usize), EditError> {
    let old = normalize_line_endings(old);
    let new = normalize_line_endings(new);
    if old.is_empty() {
        return Err(EditError::EmptySearch);
    }

    let text = doc.normalized();
    let Some(first) = text.find(&*old) else {
        return Err(EditError::SearchNotFound(old.into_owned()));
    };
    let count = text.matches(&*old).count();
    let replaced = text.replace(&*old, &new);

    let start = text[..first].matches('\n').count() + 1;
    let end = start + new.matches('\n').count();
    Ok((doc.restyle(&replaced), LineRegion::new(start, end), count))
}
