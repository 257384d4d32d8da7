//! Registry of language servers, one per language.
//!
//! Instances start lazily on the first validation for their language.
//! Lookups take the registry read lock. Starting a server holds only that
//! language's start gate, and the registry write lock is taken just to swap
//! the entry, so a slow handshake never stalls other languages. Concurrent
//! callers for the same language queue on the gate, re-check, and share one
//! process. An instance that died or collected too many strikes is swapped
//! out and shut down in the background.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use loom_io::{DEFAULT_MAX_FILE_BYTES, read_text_safe_async};
use loom_types::{ValidationResult, ValidatorKind};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::config::LspManagerConfig;
use crate::error::LspError;
use crate::language::{detect_language, language_id};
use crate::server::{InstanceSettings, LspServerInstance, ServerHealth};

/// Owns every running language server for one workspace.
pub struct LspManager {
    config: LspManagerConfig,
    servers: RwLock<HashMap<String, Arc<LspServerInstance>>>,
    start_gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl LspManager {
    /// Manager with no servers running yet.
    #[must_use]
    pub fn new(config: LspManagerConfig) -> Self {
        Self {
            config,
            servers: RwLock::new(HashMap::new()),
            start_gates: Mutex::new(HashMap::new()),
        }
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &LspManagerConfig {
        &self.config
    }

    /// Return a usable instance for `language`, spawning one if needed.
    ///
    /// # Errors
    /// `ServerUnavailable` when no enabled server is configured or the
    /// command is missing; spawn and handshake errors otherwise.
    pub async fn get_or_start_server(
        &self,
        language: &str,
    ) -> Result<Arc<LspServerInstance>, LspError> {
        if let Some(server) = self.usable_server(language).await {
            return Ok(server);
        }

        let gate = self.start_gate(language);
        let _starting = gate.lock().await;
        if let Some(server) = self.usable_server(language).await {
            return Ok(server);
        }

        let stale = self.servers.write().await.remove(language);
        if let Some(stale) = stale {
            let health = stale.health();
            tracing::warn!(
                event = "loom.lsp.manager.replace",
                language,
                status = %health.status,
                strikes = health.strikes,
                last_error = ?health.last_error,
                "replacing unusable language server"
            );
            tokio::spawn(async move { stale.shutdown().await });
        }

        let server_config = self
            .config
            .server_for(language)
            .ok_or_else(|| LspError::ServerUnavailable(language.to_string()))?;
        let instance = LspServerInstance::spawn(
            language,
            server_config,
            &self.config.workspace_root,
            self.instance_settings(),
        )
        .await?;
        self.servers
            .write()
            .await
            .insert(language.to_string(), Arc::clone(&instance));
        Ok(instance)
    }

    async fn usable_server(&self, language: &str) -> Option<Arc<LspServerInstance>> {
        let servers = self.servers.read().await;
        servers
            .get(language)
            .filter(|server| server.is_usable())
            .cloned()
    }

    fn start_gate(&self, language: &str) -> Arc<AsyncMutex<()>> {
        let mut gates = self
            .start_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(language.to_string()).or_default())
    }

    /// Validate `path` with the default diagnostics window.
    pub async fn validate_file(&self, path: &Path) -> ValidationResult {
        self.validate_file_within(path, self.config.diagnostics_timeout)
            .await
    }

    /// Validate `path`, waiting at most `wait` for diagnostics.
    ///
    /// Never fails: a disabled manager, an unknown language or a missing
    /// server yield a valid result whose `validator_used` says why nothing
    /// was checked. An expired window yields a valid `lsp` result with
    /// `timed_out` set.
    pub async fn validate_file_within(&self, path: &Path, wait: Duration) -> ValidationResult {
        let started = Instant::now();
        let language = detect_language(path);

        if !self.config.enabled {
            return ValidationResult::valid(ValidatorKind::Disabled, language)
                .with_elapsed(started.elapsed());
        }
        let Some(language) = language else {
            return ValidationResult::valid(ValidatorKind::Unsupported, None)
                .with_elapsed(started.elapsed());
        };
        let Some(server_config) = self.config.server_for(language) else {
            return ValidationResult::valid(ValidatorKind::Unsupported, Some(language))
                .with_elapsed(started.elapsed());
        };

        let unavailable = |reason: &dyn std::fmt::Display| {
            tracing::warn!(
                event = "loom.lsp.validate.unavailable",
                language,
                path = %path.display(),
                reason = %reason,
                "validation skipped; language server unavailable"
            );
            ValidationResult::valid(ValidatorKind::Unavailable, Some(language))
                .with_server(server_config.command.clone())
                .with_elapsed(started.elapsed())
        };

        let text = match read_text_safe_async(path, DEFAULT_MAX_FILE_BYTES).await {
            Ok(text) => text,
            Err(err) => return unavailable(&err),
        };
        let server = match self.get_or_start_server(language).await {
            Ok(server) => server,
            Err(err) => return unavailable(&err),
        };

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config.workspace_root.join(path)
        };
        let lang_id = language_id(language, path);
        let result = match server
            .collect_diagnostics(&absolute, &lang_id, &text, wait)
            .await
        {
            Ok(Some(diagnostics)) => {
                ValidationResult::from_diagnostics(diagnostics, ValidatorKind::Lsp, Some(language))
            }
            Ok(None) => {
                let mut result = ValidationResult::valid(ValidatorKind::Lsp, Some(language));
                result.timed_out = true;
                result
            }
            Err(err) => return unavailable(&err),
        }
        .with_server(server_config.command.clone())
        .with_elapsed(started.elapsed());

        tracing::info!(
            event = "loom.lsp.validate.done",
            language,
            path = %path.display(),
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            timed_out = result.timed_out,
            elapsed_ms = result.elapsed_ms,
            "file validated"
        );
        result
    }

    /// Shut down the server for `language`, if running.
    pub async fn shutdown(&self, language: &str) {
        let removed = self.servers.write().await.remove(language);
        if let Some(server) = removed {
            server.shutdown().await;
        }
    }

    /// Shut down every server.
    pub async fn shutdown_all(&self) {
        let drained: Vec<Arc<LspServerInstance>> =
            self.servers.write().await.drain().map(|(_, s)| s).collect();
        for server in drained {
            server.shutdown().await;
        }
    }

    /// Health of every running server, sorted by language.
    pub async fn server_states(&self) -> Vec<ServerHealth> {
        let mut states: Vec<ServerHealth> = self
            .servers
            .read()
            .await
            .values()
            .map(|server| server.health())
            .collect();
        states.sort_by(|a, b| a.language.cmp(&b.language));
        states
    }

    fn instance_settings(&self) -> InstanceSettings {
        InstanceSettings {
            request_timeout: self.config.request_timeout,
            shutdown_grace: self.config.shutdown_grace,
            max_strikes: self.config.max_strikes,
        }
    }
}
