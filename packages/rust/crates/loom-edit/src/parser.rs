//! LOOM_EDIT directive parsing.
//!
//! Extracts `>>LOOM_EDIT … <<LOOM_EDIT` blocks from free-form agent output
//! and interprets each header into an [`EditCommand`].
//!
//! Header numbers drift in practice: a single number for REPLACE/DELETE is
//! read as a one-line range and a range for INSERT_* uses its start. Both
//! cases are logged at `warn`.

use loom_io::normalize_line_endings;

use crate::error::ParseError;
use crate::scanner::{Token, scan_header};
use crate::types::{CLOSING_MARKER, EditAction, EditCommand, EditOp, HEADER_MARKER};

/// Parse exactly one directive. Text before the header is ignored, as is
/// anything after the closing marker.
///
/// # Errors
/// Returns [`ParseError`] when the input is empty, has no header, or the
/// first block is malformed.
pub fn parse(text: &str) -> Result<EditCommand, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let normalized = normalize_line_endings(text);
    let start = find_header(&normalized, 0).ok_or(ParseError::MissingHeader)?;
    parse_block(&normalized, start).0
}

/// Parse every directive in `text`, in order. A malformed block yields an
/// `Err` entry and parsing resumes at the next header.
#[must_use]
pub fn parse_all(text: &str) -> Vec<Result<EditCommand, ParseError>> {
    let normalized = normalize_line_endings(text);
    let mut results = Vec::new();
    let mut offset = 0;
    while let Some(start) = find_header(&normalized, offset) {
        let (result, next) = parse_block(&normalized, start);
        results.push(result);
        offset = next;
    }
    results
}

/// Byte offset of the next header marker that begins a line (after optional
/// indentation), searching from `from`.
fn find_header(src: &str, from: usize) -> Option<usize> {
    let mut line_start = from;
    for line in src[from..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with(HEADER_MARKER) {
            return Some(line_start + (line.len() - trimmed.len()));
        }
        line_start += line.len();
    }
    None
}

/// Parse the block whose marker starts at `marker`. Returns the result and
/// the offset where scanning for the next block should resume.
fn parse_block(src: &str, marker: usize) -> (Result<EditCommand, ParseError>, usize) {
    let header_start = marker + HEADER_MARKER.len();
    let (tokens, header_len) = match scan_header(&src[header_start..]) {
        Ok(scanned) => scanned,
        Err(err) => return (Err(err), skip_line(src, header_start)),
    };
    let body_start = header_start + header_len;

    let mut cursor = body_start;
    let mut close = None;
    for line in src[body_start..].split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed == CLOSING_MARKER {
            close = Some((cursor, cursor + line.len()));
            break;
        }
        if trimmed.starts_with(HEADER_MARKER) {
            tracing::warn!(
                event = "loom.edit.parse.unclosed",
                offset = marker,
                "directive ended by a new header before its closing marker"
            );
            return (Err(ParseError::MissingClosingMarker), cursor);
        }
        cursor += line.len();
    }
    let Some((close_start, next)) = close else {
        return (Err(ParseError::MissingClosingMarker), src.len());
    };

    let body = &src[body_start..close_start];
    (interpret(&tokens, body), next)
}

fn skip_line(src: &str, from: usize) -> usize {
    src[from..].find('\n').map_or(src.len(), |idx| from + idx + 1)
}

fn interpret(tokens: &[Token], body: &str) -> Result<EditCommand, ParseError> {
    let mut path: Option<String> = None;
    let mut file_hash: Option<String> = None;
    let mut action: Option<EditAction> = None;
    let mut numbers: Vec<&str> = Vec::new();
    let mut strings: Vec<&str> = Vec::new();

    for token in tokens {
        if !token.quoted
            && let Some(value) = token.text.strip_prefix("file=")
        {
            path = Some(value.to_string());
        } else if !token.quoted
            && let Some(value) = token.text.strip_prefix("v=")
        {
            file_hash = Some(value.to_string());
        } else if action.is_none() {
            if token.quoted {
                return Err(ParseError::MissingAction);
            }
            action = Some(
                EditAction::from_keyword(&token.text)
                    .ok_or_else(|| ParseError::UnknownAction(token.text.clone()))?,
            );
        } else if token.quoted {
            strings.push(&token.text);
        } else {
            numbers.push(&token.text);
        }
    }

    let path = path
        .filter(|p| !p.trim().is_empty())
        .ok_or(ParseError::MissingFile)?;
    let action = action.ok_or(ParseError::MissingAction)?;

    let op = match action {
        EditAction::Replace | EditAction::Delete => {
            let (start, end) = parse_range(action, &numbers)?;
            if action == EditAction::Replace {
                EditOp::Replace { start, end }
            } else {
                if !body.trim().is_empty() {
                    tracing::debug!(
                        event = "loom.edit.parse.body_ignored",
                        action = %action,
                        "DELETE body ignored"
                    );
                }
                EditOp::Delete { start, end }
            }
        }
        EditAction::InsertAfter | EditAction::InsertBefore => {
            let (line, end) = parse_range(action, &numbers)?;
            if end != line {
                tracing::warn!(
                    event = "loom.edit.parse.drift",
                    action = %action,
                    start = line,
                    end,
                    "insert takes one line number; using range start"
                );
            }
            if action == EditAction::InsertAfter {
                EditOp::InsertAfter { line }
            } else {
                EditOp::InsertBefore { line }
            }
        }
        EditAction::SearchReplace => {
            let [old, new, ..] = strings.as_slice() else {
                return Err(ParseError::MissingSearchStrings);
            };
            EditOp::SearchReplace {
                old: (*old).to_string(),
                new: (*new).to_string(),
            }
        }
        EditAction::Create => {
            if !numbers.is_empty() {
                tracing::debug!(
                    event = "loom.edit.parse.extra_tokens",
                    tokens = ?numbers,
                    "CREATE ignores line numbers"
                );
            }
            EditOp::Create
        }
    };

    Ok(EditCommand {
        path,
        file_hash,
        op,
        body: body.to_string(),
    })
}

/// Parse `n`, `n-m` or `n - m` into an inclusive 1-based range. A single
/// number yields `(n, n)`.
fn parse_range(action: EditAction, numbers: &[&str]) -> Result<(usize, usize), ParseError> {
    let joined: String = numbers.concat();
    if joined.is_empty() {
        return Err(ParseError::MissingLineNumber(action));
    }

    let (start_raw, end_raw) = match joined.split_once('-') {
        Some((s, e)) => (s, Some(e)),
        None => (joined.as_str(), None),
    };
    let start = parse_line_number(start_raw)?;
    let end = match end_raw {
        Some(raw) => parse_line_number(raw)?,
        None => {
            if matches!(action, EditAction::Replace | EditAction::Delete) {
                tracing::warn!(
                    event = "loom.edit.parse.drift",
                    action = %action,
                    line = start,
                    "single line number; treating as a one-line range"
                );
            }
            start
        }
    };

    if end < start {
        return Err(ParseError::InvalidRange { start, end });
    }
    Ok((start, end))
}

fn parse_line_number(raw: &str) -> Result<usize, ParseError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::InvalidLineNumber(raw.to_string())),
    }
}
