//! Error types for command parsing and patch application.
//!
//! Library crates use `thiserror` for explicit error enums.

use loom_io::IoError;
use thiserror::Error;

use crate::types::EditAction;

/// Malformed LOOM_EDIT directive. Never partially applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input was empty or whitespace.
    #[error("empty edit command")]
    Empty,

    /// No `>>LOOM_EDIT` header line found.
    #[error("missing >>LOOM_EDIT header")]
    MissingHeader,

    /// Header has no `file=` token.
    #[error("missing file= in header")]
    MissingFile,

    /// Header has no action keyword.
    #[error("missing action in header")]
    MissingAction,

    /// Action keyword is not recognized.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A quoted header string never closed.
    #[error("unterminated quoted string in header")]
    UnterminatedQuote,

    /// No `<<LOOM_EDIT` line after the header.
    #[error("missing <<LOOM_EDIT closing marker")]
    MissingClosingMarker,

    /// Action requires a line number but none was given.
    #[error("{0} requires a line number")]
    MissingLineNumber(EditAction),

    /// Line number is not a positive integer.
    #[error("invalid line number: {0}")]
    InvalidLineNumber(String),

    /// `end < start`.
    #[error("invalid range: end {end} is before start {start}")]
    InvalidRange {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },

    /// SEARCH_REPLACE without two quoted strings.
    #[error("SEARCH_REPLACE requires two quoted strings: \"old\" \"new\"")]
    MissingSearchStrings,
}

/// Error types for edit operations.
///
/// Range errors are detected before any file write.
#[derive(Error, Debug)]
pub enum EditError {
    /// File I/O error (reading or writing the target).
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Directive could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Single line outside `[1, line_count]`.
    #[error("line {line} out of range (file has {line_count} lines)")]
    LineOutOfRange {
        /// Requested line.
        line: usize,
        /// Lines in the file.
        line_count: usize,
    },

    /// Range outside `[1, line_count]`.
    #[error("range {start}-{end} out of range (file has {line_count} lines)")]
    RangeOutOfBounds {
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
        /// Lines in the file.
        line_count: usize,
    },

    /// SEARCH_REPLACE string absent from the file.
    #[error("search string not found: {0:?}")]
    SearchNotFound(String),

    /// SEARCH_REPLACE with an empty search string.
    #[error("search string is empty")]
    EmptySearch,

    /// CREATE on a path that already exists.
    #[error("file already exists: {0}")]
    AlreadyExists(String),

    /// `v=` hash does not match the current file content.
    #[error("file changed since it was read: expected hash {expected}, current {actual}")]
    StaleFile {
        /// Hash from the directive.
        expected: String,
        /// Hash of the file on disk.
        actual: String,
    },

    /// `v=` value too short or not hex.
    #[error("invalid file hash: {0}")]
    InvalidHash(String),

    /// Target path resolves outside the workspace root.
    #[error("path escapes workspace: {0}")]
    OutsideWorkspace(String),
}
