//! Runtime settings loader for loom.
//!
//! Loads and merges:
//! - User defaults:     `<LOOM_CONFIG_HOME>/settings.yaml` (default `~/.config/loom`)
//! - Project overrides: `<workspace>/.loom/settings.yaml`
//!
//! Merge precedence is project over user. `--conf <dir>` replaces the user
//! config home.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use loom_guard::GuardConfig;
use loom_lsp::{LspManagerConfig, LspServerConfig};
use loom_undo::DEFAULT_MAX_ENTRIES;
use serde::Deserialize;

const SETTINGS_FILE_NAME: &str = "settings.yaml";
const PROJECT_SETTINGS_RELATIVE_PATH: &str = ".loom/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config/loom";
pub const DEFAULT_UNDO_DIR: &str = ".loom/undo";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub lsp: LspSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub undo: UndoSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LspSettings {
    pub enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub diagnostics_timeout_secs: Option<u64>,
    pub shutdown_grace_ms: Option<u64>,
    pub max_strikes: Option<u32>,
    pub servers: Option<HashMap<String, LspServerConfig>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationSettings {
    pub fallback_enabled: Option<bool>,
    pub rollback_on_error: Option<bool>,
    pub critical_patterns: Option<Vec<String>>,
    pub context_buffer_lines: Option<usize>,
    pub verify_file_hash: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UndoSettings {
    pub dir: Option<String>,
    pub max_entries: Option<usize>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            lsp: self.lsp.merge(overlay.lsp),
            validation: self.validation.merge(overlay.validation),
            undo: self.undo.merge(overlay.undo),
        }
    }

    /// Language server settings rooted at `workspace_root`. Configured
    /// servers replace the built-in entry for their language.
    #[must_use]
    pub fn lsp_manager_config(&self, workspace_root: &Path) -> LspManagerConfig {
        let mut config = LspManagerConfig::new(workspace_root);
        let lsp = &self.lsp;
        if let Some(enabled) = lsp.enabled {
            config.enabled = enabled;
        }
        if let Some(secs) = lsp.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lsp.diagnostics_timeout_secs {
            config.diagnostics_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = lsp.shutdown_grace_ms {
            config.shutdown_grace = Duration::from_millis(ms);
        }
        if let Some(strikes) = lsp.max_strikes {
            config.max_strikes = strikes.max(1);
        }
        if let Some(servers) = &lsp.servers {
            config
                .servers
                .extend(servers.iter().map(|(lang, cfg)| (lang.clone(), cfg.clone())));
        }
        config
    }

    #[must_use]
    pub fn guard_config(&self) -> GuardConfig {
        let defaults = GuardConfig::default();
        let v = &self.validation;
        GuardConfig {
            fallback_enabled: v.fallback_enabled.unwrap_or(defaults.fallback_enabled),
            rollback_on_error: v.rollback_on_error.unwrap_or(defaults.rollback_on_error),
            critical_patterns: v
                .critical_patterns
                .clone()
                .unwrap_or(defaults.critical_patterns),
            context_buffer_lines: v
                .context_buffer_lines
                .unwrap_or(defaults.context_buffer_lines),
            verify_file_hash: v.verify_file_hash.unwrap_or(defaults.verify_file_hash),
        }
    }

    /// Undo store directory; relative values resolve against the workspace.
    #[must_use]
    pub fn undo_dir(&self, workspace_root: &Path) -> PathBuf {
        let dir = self
            .undo
            .dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_UNDO_DIR);
        absolutize(workspace_root, PathBuf::from(dir))
    }

    #[must_use]
    pub fn undo_max_entries(&self) -> usize {
        self.undo.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES).max(1)
    }
}

impl LspSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            enabled: overlay.enabled.or(self.enabled),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
            diagnostics_timeout_secs: overlay
                .diagnostics_timeout_secs
                .or(self.diagnostics_timeout_secs),
            shutdown_grace_ms: overlay.shutdown_grace_ms.or(self.shutdown_grace_ms),
            max_strikes: overlay.max_strikes.or(self.max_strikes),
            servers: merge_servers(self.servers, overlay.servers),
        }
    }
}

fn merge_servers(
    base: Option<HashMap<String, LspServerConfig>>,
    overlay: Option<HashMap<String, LspServerConfig>>,
) -> Option<HashMap<String, LspServerConfig>> {
    match (base, overlay) {
        (None, None) => None,
        (Some(base), None) => Some(base),
        (None, Some(overlay)) => Some(overlay),
        (Some(mut base), Some(overlay)) => {
            base.extend(overlay);
            Some(base)
        }
    }
}

impl ValidationSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            fallback_enabled: overlay.fallback_enabled.or(self.fallback_enabled),
            rollback_on_error: overlay.rollback_on_error.or(self.rollback_on_error),
            critical_patterns: overlay.critical_patterns.or(self.critical_patterns),
            context_buffer_lines: overlay.context_buffer_lines.or(self.context_buffer_lines),
            verify_file_hash: overlay.verify_file_hash.or(self.verify_file_hash),
        }
    }
}

impl UndoSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            dir: overlay.dir.or(self.dir),
            max_entries: overlay.max_entries.or(self.max_entries),
        }
    }
}

/// Load user then project settings for `workspace_root`.
#[must_use]
pub fn load_runtime_settings(workspace_root: &Path) -> RuntimeSettings {
    let (user_path, project_path) = runtime_settings_paths(workspace_root);
    load_runtime_settings_from_paths(&user_path, &project_path)
}

#[doc(hidden)]
#[must_use]
pub fn runtime_settings_paths(workspace_root: &Path) -> (PathBuf, PathBuf) {
    let user_path = resolve_config_home(workspace_root).join(SETTINGS_FILE_NAME);
    let project_path = workspace_root.join(PROJECT_SETTINGS_RELATIVE_PATH);
    (user_path, project_path)
}

#[doc(hidden)]
#[must_use]
pub fn load_runtime_settings_from_paths(user: &Path, project: &Path) -> RuntimeSettings {
    load_one(user).merge(load_one(project))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event = "loom.config.read_failed",
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<Option<RuntimeSettings>>(&raw) {
        Ok(value) => value.unwrap_or_default(),
        Err(error) => {
            tracing::warn!(
                event = "loom.config.parse_failed",
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to the workspace.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(workspace_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(workspace_root, path.clone());
    }
    if let Some(configured) = env_path("LOOM_CONFIG_HOME") {
        return absolutize(workspace_root, configured);
    }
    match env_path("HOME") {
        Some(home) => home.join(DEFAULT_CONFIG_HOME_RELATIVE_PATH),
        None => workspace_root.join(DEFAULT_CONFIG_HOME_RELATIVE_PATH),
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn absolutize(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
