//! `Content-Length` framing for JSON-RPC over stdio.
//!
//! ```text
//! Content-Length: 52\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"initialize",...}
//! ```

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::LspError;

/// Largest body accepted from a server.
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Frame one JSON message.
///
/// # Errors
/// Serialization failure.
pub fn encode_message(message: &Value) -> Result<Vec<u8>, LspError> {
    let body = serde_json::to_vec(message)?;
    let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read one framed message. `Ok(None)` on clean EOF before a header.
///
/// A body that is not valid JSON yields `LspError::Json`; the stream stays
/// in sync since the body was consumed. Header and I/O failures are
/// `Transport` errors and leave the stream unusable.
///
/// # Errors
/// See above.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Value>, LspError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut line = String::new();
    let mut saw_header = false;

    loop {
        line.clear();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| LspError::Transport(format!("read header: {e}")))?;
        if read == 0 {
            if saw_header {
                return Err(LspError::Transport("EOF inside message header".to_string()));
            }
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            if saw_header {
                break;
            }
            continue;
        }
        saw_header = true;

        let Some((name, value)) = trimmed.split_once(':') else {
            return Err(LspError::Transport(format!("malformed header: {trimmed}")));
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let len = value
                .trim()
                .parse::<usize>()
                .map_err(|_| LspError::Transport(format!("bad Content-Length: {}", value.trim())))?;
            content_length = Some(len);
        }
    }

    let len = content_length
        .ok_or_else(|| LspError::Transport("missing Content-Length header".to_string()))?;
    if len > MAX_MESSAGE_BYTES {
        return Err(LspError::Transport(format!(
            "message of {len} bytes exceeds limit"
        )));
    }

    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| LspError::Transport(format!("read body: {e}")))?;
    Ok(Some(serde_json::from_slice(&body)?))
}
