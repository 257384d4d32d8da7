//! Optional stale-file guard for the `v=` header field.

use loom_io::normalize_line_endings;
use sha2::{Digest, Sha256};

use crate::error::EditError;
use crate::types::EditCommand;

/// Shortest accepted `v=` prefix.
pub const MIN_HASH_PREFIX: usize = 6;

/// Lowercase hex SHA-256 of `text` after line-ending normalization, so a
/// CRLF checkout hashes the same as its LF twin.
#[must_use]
pub fn content_hash(text: &str) -> String {
    let normalized = normalize_line_endings(text);
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Check the command's `v=` prefix against `current` content. Commands
/// without a hash always pass.
///
/// # Errors
/// `InvalidHash` for a prefix shorter than [`MIN_HASH_PREFIX`] or with
/// non-hex characters; `StaleFile` on mismatch.
pub fn verify_file_hash(cmd: &EditCommand, current: &str) -> Result<(), EditError> {
    let Some(expected) = cmd.file_hash.as_deref() else {
        return Ok(());
    };
    let expected = expected.to_ascii_lowercase();
    if expected.len() < MIN_HASH_PREFIX || !expected.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EditError::InvalidHash(expected));
    }

    let actual = content_hash(current);
    if actual.starts_with(&expected) {
        Ok(())
    } else {
        tracing::warn!(
            event = "loom.edit.hash.stale",
            path = %cmd.path,
            expected = %expected,
            actual = %&actual[..expected.len().min(actual.len())],
            "file hash mismatch"
        );
        Err(EditError::StaleFile { expected, actual })
    }
}
