//! Asynchronous file I/O operations.
//!
//! Powered by Tokio; used by the language-server client to load documents
//! for `textDocument/didOpen`.

use std::path::Path;

use tokio::fs as tokio_fs;
use tokio::io::AsyncReadExt;

use crate::detect::decode_buffer;
use crate::error::IoError;

/// Read text from a file with size and binary checks (asynchronous).
///
/// # Errors
/// `NotFound` when the file is missing, `TooLarge` over the cap,
/// `BinaryFile` for binary content.
///
/// # Example
///
/// ```rust,ignore
/// use loom_io::read_text_safe_async;
///
/// let content = read_text_safe_async("src/lib.rs", 1024 * 1024).await?;
/// ```
pub async fn read_text_safe_async<P: AsRef<Path>>(
    path: P,
    max_bytes: u64,
) -> Result<String, IoError> {
    let path = path.as_ref();

    let metadata = tokio_fs::metadata(path)
        .await
        .map_err(|_| IoError::NotFound(path.to_string_lossy().to_string()))?;

    if metadata.len() > max_bytes {
        return Err(IoError::TooLarge(metadata.len(), max_bytes));
    }

    let mut file = tokio_fs::File::open(path).await?;
    let mut buffer = Vec::with_capacity(usize::try_from(metadata.len()).unwrap_or_default());
    file.read_to_end(&mut buffer).await?;

    decode_buffer(buffer)
}
