//! Synchronous file I/O operations.
//!
//! Used by the patch applier and the undo store, which perform whole-file
//! operations one edit at a time.

use std::fs as std_fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::detect::{decode_buffer, decode_buffer_strict};
use crate::error::IoError;

/// Default size cap for files the pipeline will read (10MB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Read text from a file with size and binary checks (synchronous).
///
/// # Arguments
/// * `path` - Path to the file
/// * `max_bytes` - Maximum file size in bytes
///
/// # Returns
/// Decoded text content or an error.
///
/// # Errors
/// `NotFound` when the file is missing, `TooLarge` over the cap,
/// `BinaryFile` for binary content.
pub fn read_text_safe<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<String, IoError> {
    decode_buffer(read_capped(path.as_ref(), max_bytes)?)
}

/// Read text for rewriting: same checks as [`read_text_safe`], but invalid
/// UTF-8 is an error instead of being replaced.
///
/// # Errors
/// `NotFound`, `TooLarge`, `BinaryFile`, or `InvalidUtf8`.
pub fn read_text_strict<P: AsRef<Path>>(path: P, max_bytes: u64) -> Result<String, IoError> {
    let path = path.as_ref();
    decode_buffer_strict(read_capped(path, max_bytes)?, &path.display().to_string())
}

fn read_capped(path: &Path, max_bytes: u64) -> Result<Vec<u8>, IoError> {
    let metadata = std_fs::metadata(path)
        .map_err(|_| IoError::NotFound(path.to_string_lossy().to_string()))?;

    if metadata.len() > max_bytes {
        return Err(IoError::TooLarge(metadata.len(), max_bytes));
    }

    let mut file = std_fs::File::open(path)?;
    let mut buffer = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or_default());
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// Write bytes atomically:
/// - ensure parent directory exists
/// - write to a temp file in the same directory
/// - carry over the target's permissions when it already exists
/// - fsync file + rename into place
///
/// # Errors
/// Returns `IoError::Write` naming the step's path when any step fails.
pub fn atomic_write_bytes<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<(), IoError> {
    let path = path.as_ref();
    let write_err = |p: &Path, source: std::io::Error| IoError::Write {
        path: p.display().to_string(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std_fs::create_dir_all(parent).map_err(|e| write_err(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("file");
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = (|| {
        let mut temp_file =
            std_fs::File::create(&temp_path).map_err(|e| write_err(&temp_path, e))?;
        temp_file
            .write_all(content)
            .map_err(|e| write_err(&temp_path, e))?;
        temp_file.sync_all().map_err(|e| write_err(&temp_path, e))?;
        drop(temp_file);

        if let Ok(metadata) = std_fs::metadata(path) {
            std_fs::set_permissions(&temp_path, metadata.permissions())
                .map_err(|e| write_err(&temp_path, e))?;
        }
        std_fs::rename(&temp_path, path).map_err(|e| write_err(path, e))
    })();

    if result.is_err() {
        let _ = std_fs::remove_file(&temp_path);
    }
    result
}

/// Write text atomically. See [`atomic_write_bytes`].
///
/// # Errors
/// Returns `IoError::Write` when any step fails.
pub fn atomic_write_text<P: AsRef<Path>>(path: P, content: &str) -> Result<(), IoError> {
    atomic_write_bytes(path, content.as_bytes())
}
