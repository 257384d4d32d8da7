//! Error types for file I/O operations.
//!
//! Library crates use `thiserror` for explicit error enums.

use thiserror::Error;

/// Error types for file I/O operations.
///
/// Each variant represents a specific failure mode in the I/O pipeline.
#[derive(Error, Debug)]
pub enum IoError {
    /// File does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// File exceeds size limit.
    #[error("File too large: {0} bytes (limit: {1})")]
    TooLarge(u64, u64),

    /// File contains binary content (NULL bytes detected).
    #[error("Binary file detected")]
    BinaryFile,

    /// Content is not valid UTF-8 and must not be rewritten.
    #[error("Invalid UTF-8 in {path} at byte {valid_up_to}")]
    InvalidUtf8 {
        /// Source path.
        path: String,
        /// Length of the valid prefix.
        valid_up_to: usize,
    },

    /// Low-level I/O error from std::io.
    #[error("IO error: {0}")]
    System(#[from] std::io::Error),

    /// Whole-file write failed at a specific step.
    #[error("Write failed for {path}: {source}")]
    Write {
        /// Target path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}
