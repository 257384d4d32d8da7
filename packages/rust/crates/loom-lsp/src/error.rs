//! LSP client errors.

use thiserror::Error;

use crate::protocol::RpcError;

/// Errors from spawning and talking to language servers.
#[derive(Error, Debug)]
pub enum LspError {
    /// Server command not found on `PATH`, or no server configured.
    #[error("language server unavailable: {0}")]
    ServerUnavailable(String),

    /// Process could not be started.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// Resolved command.
        command: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Request or handshake exceeded its deadline.
    #[error("{0} timed out")]
    Timeout(String),

    /// Broken pipe, EOF or malformed framing.
    #[error("transport error: {0}")]
    Transport(String),

    /// Well-framed message with an unexpected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Server answered with a JSON-RPC error.
    #[error("server error {}: {}", .0.code, .0.message)]
    Rpc(RpcError),

    /// Instance is shut down or its workers are gone.
    #[error("language server shut down")]
    Shutdown,

    /// Path cannot be expressed as a `file://` URI.
    #[error("invalid document path: {0}")]
    InvalidPath(String),

    /// IO error on the pipes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<RpcError> for LspError {
    fn from(err: RpcError) -> Self {
        Self::Rpc(err)
    }
}
