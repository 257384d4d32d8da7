//! Binary detection and decoding utilities.
//!
//! Quick binary detection using NULL byte scanning.

use memchr::memchr;

use crate::error::IoError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Quick binary detection - checks first 8KB for NULL bytes.
///
/// Files containing NULL bytes in the first 8KB are considered binary.
#[must_use]
pub fn is_binary(buffer: &[u8]) -> bool {
    let check_len = std::cmp::min(buffer.len(), 8192);
    memchr(0, &buffer[..check_len]).is_some()
}

/// Decode bytes to String with lossy fallback.
///
/// Rejects binary content and replaces invalid UTF-8 sequences with U+FFFD.
/// A UTF-8 BOM survives as `\u{feff}`.
///
/// # Errors
/// Returns `IoError::BinaryFile` when binary content is detected.
pub fn decode_buffer(buffer: Vec<u8>) -> Result<String, IoError> {
    if is_binary(&buffer) {
        return Err(IoError::BinaryFile);
    }

    match String::from_utf8(buffer) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            tracing::debug!(
                event = "loom.io.decode.lossy",
                len = bytes.len(),
                has_bom = bytes.starts_with(UTF8_BOM),
                "invalid UTF-8; decoding lossily"
            );
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// Decode bytes to String, refusing anything that is not valid UTF-8.
///
/// Used on the write path, where a lossy decode would rewrite bytes the
/// edit never touched.
///
/// # Errors
/// `BinaryFile` for binary content, `InvalidUtf8` naming `path` otherwise.
pub fn decode_buffer_strict(buffer: Vec<u8>, path: &str) -> Result<String, IoError> {
    if is_binary(&buffer) {
        return Err(IoError::BinaryFile);
    }

    String::from_utf8(buffer).map_err(|e| IoError::InvalidUtf8 {
        path: path.to_string(),
        valid_up_to: e.utf8_error().valid_up_to(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_past_window_is_text() {
        let mut buffer = vec![b'a'; 9000];
        buffer.push(0);
        assert!(!is_binary(&buffer));
    }

    #[test]
    fn test_bom_preserved() {
        let decoded = decode_buffer(b"\xEF\xBB\xBFhello".to_vec()).unwrap();
        assert!(decoded.starts_with('\u{feff}'));
    }

    #[test]
    fn test_strict_decode_reports_offset() {
        let err = decode_buffer_strict(b"caf\xE9\n".to_vec(), "menu.txt").unwrap_err();
        assert!(matches!(
            err,
            IoError::InvalidUtf8 { ref path, valid_up_to: 3 } if path == "menu.txt"
        ));
    }

    #[test]
    fn test_strict_decode_keeps_bom() {
        let decoded = decode_buffer_strict(b"\xEF\xBB\xBFhi".to_vec(), "x").unwrap();
        assert_eq!(decoded, "\u{feff}hi");
    }
}
