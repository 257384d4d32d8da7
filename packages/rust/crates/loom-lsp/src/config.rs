//! Language server configuration.
//!
//! `LspServerConfig` is the per-language shape users write in
//! `settings.yaml`; `LspManagerConfig` is the resolved runtime view.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default `initialize` / request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Default wait for `publishDiagnostics` after `didOpen`.
pub const DEFAULT_DIAGNOSTICS_TIMEOUT_SECS: u64 = 3;
/// Grace period between `exit` and force-kill.
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 500;
/// Consecutive failures before an instance is replaced.
pub const DEFAULT_MAX_STRIKES: u32 = 3;

/// How to launch one language server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LspServerConfig {
    /// Executable name or path.
    pub command: String,
    /// Arguments (e.g. `["--stdio"]`).
    #[serde(default)]
    pub args: Vec<String>,
    /// Sent as `initializationOptions`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_options: Option<Value>,
    /// Extra environment variables for the child.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Set to `false` to skip this language.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl LspServerConfig {
    /// Enabled config with no init options or env.
    #[must_use]
    pub fn new(command: impl Into<String>, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(ToString::to_string).collect(),
            init_options: None,
            env: HashMap::new(),
            enabled: true,
        }
    }
}

/// Built-in server table keyed by language.
#[must_use]
pub fn default_servers() -> HashMap<String, LspServerConfig> {
    let ts = LspServerConfig::new("typescript-language-server", &["--stdio"]);
    [
        ("rust", LspServerConfig::new("rust-analyzer", &[])),
        ("go", LspServerConfig::new("gopls", &[])),
        ("typescript", ts.clone()),
        ("javascript", ts),
        ("python", LspServerConfig::new("pylsp", &[])),
        ("c", LspServerConfig::new("clangd", &[])),
        ("cpp", LspServerConfig::new("clangd", &[])),
    ]
    .into_iter()
    .map(|(lang, cfg)| (lang.to_string(), cfg))
    .collect()
}

/// Resolved manager settings.
#[derive(Clone, Debug)]
pub struct LspManagerConfig {
    /// Child working directory and `rootUri`.
    pub workspace_root: PathBuf,
    /// Servers by language.
    pub servers: HashMap<String, LspServerConfig>,
    /// Master switch; when off every validation is `disabled`.
    pub enabled: bool,
    /// `initialize` and request timeout.
    pub request_timeout: Duration,
    /// Default diagnostics window.
    pub diagnostics_timeout: Duration,
    /// Wait after `exit` before force-kill.
    pub shutdown_grace: Duration,
    /// Consecutive strikes that make an instance unusable.
    pub max_strikes: u32,
}

impl LspManagerConfig {
    /// Defaults rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            servers: default_servers(),
            enabled: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            diagnostics_timeout: Duration::from_secs(DEFAULT_DIAGNOSTICS_TIMEOUT_SECS),
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
            max_strikes: DEFAULT_MAX_STRIKES,
        }
    }

    /// Override or add the server for `language`.
    #[must_use]
    pub fn with_server(mut self, language: impl Into<String>, server: LspServerConfig) -> Self {
        self.servers.insert(language.into(), server);
        self
    }

    /// Enabled server for `language`, if any.
    #[must_use]
    pub fn server_for(&self, language: &str) -> Option<&LspServerConfig> {
        self.servers.get(language).filter(|cfg| cfg.enabled)
    }
}
