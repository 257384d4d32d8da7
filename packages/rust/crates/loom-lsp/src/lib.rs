//! Language server process manager.
//!
//! Spawns one server per language, speaks LSP JSON-RPC over stdio, and turns
//! pushed diagnostics into a [`loom_types::ValidationResult`].
//!
//! - [`LspManager`]: per-workspace registry; `validate_file` entry point.
//! - [`LspServerInstance`]: one child process and its workers.
//! - [`codec`]: `Content-Length` framing, shared with the `loom-mock-lsp`
//!   test server.

pub mod codec;
mod config;
mod error;
mod language;
mod manager;
pub mod protocol;
mod server;

pub use config::{
    DEFAULT_DIAGNOSTICS_TIMEOUT_SECS, DEFAULT_MAX_STRIKES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_GRACE_MS, LspManagerConfig, LspServerConfig, default_servers,
};
pub use error::LspError;
pub use language::{detect_language, language_id};
pub use manager::LspManager;
pub use server::{InstanceSettings, LspServerInstance, ServerHealth, ServerStatus};
