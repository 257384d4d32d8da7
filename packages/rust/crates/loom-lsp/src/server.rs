//! One running language server.
//!
//! Each instance owns a child process and four workers:
//!
//! ```text
//!  request()/notify() ──outgoing──▶ writer ──stdin──▶ server
//!         │                                              │
//!         └──Register──▶ dispatcher ◀──Response──── reader ◀──stdout
//!                            │                         │
//!                 answers server requests     publishDiagnostics ──▶ broadcast
//!                                                 stderr ──▶ drain (debug log)
//! ```
//!
//! Registrations and responses share one FIFO channel into the dispatcher,
//! so a response can never overtake the registration of its request. The
//! health record is the only state shared outside of channels.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use loom_types::Diagnostic;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::codec::{encode_message, read_message};
use crate::config::LspServerConfig;
use crate::error::LspError;
use crate::protocol::{self, Incoming, PublishDiagnosticsParams, RpcError};

const DIAGNOSTICS_CHANNEL_CAPACITY: usize = 64;
const SHUTDOWN_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// Process spawned, handshake in flight.
    Starting,
    /// Handshake done, no request answered since.
    Initialized,
    /// Last interaction succeeded.
    Healthy,
    /// Recent timeouts or errors; replaced after too many strikes.
    Degraded,
    /// Shut down or process gone.
    Shutdown,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Initialized => "initialized",
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of an instance for status display.
#[derive(Debug, Clone, Serialize)]
pub struct ServerHealth {
    /// Language key.
    pub language: String,
    /// Server command.
    pub command: String,
    /// Lifecycle state.
    pub status: ServerStatus,
    /// Consecutive failures.
    pub strikes: u32,
    /// Most recent failure.
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct HealthState {
    status: ServerStatus,
    strikes: u32,
    last_error: Option<String>,
    alive: bool,
}

enum DispatchEvent {
    Register {
        id: i64,
        reply: oneshot::Sender<Result<Value, LspError>>,
    },
    Cancel {
        id: i64,
    },
    Response {
        id: i64,
        result: Result<Value, RpcError>,
    },
    ServerRequest {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    Closed {
        reason: String,
    },
}

/// Timing knobs for one instance.
#[derive(Debug, Clone, Copy)]
pub struct InstanceSettings {
    /// `initialize` and request timeout.
    pub request_timeout: Duration,
    /// Wait after `exit` before force-kill.
    pub shutdown_grace: Duration,
    /// Consecutive strikes that make the instance unusable.
    pub max_strikes: u32,
}

/// A spawned, initialized language server.
pub struct LspServerInstance {
    language: String,
    command: String,
    outgoing: mpsc::UnboundedSender<Value>,
    dispatch: mpsc::UnboundedSender<DispatchEvent>,
    diagnostics: broadcast::Sender<PublishDiagnosticsParams>,
    shutdown_tx: watch::Sender<bool>,
    health: Arc<Mutex<HealthState>>,
    next_id: AtomicI64,
    next_version: AtomicI64,
    capabilities: OnceLock<Value>,
    child: tokio::sync::Mutex<Option<Child>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    settings: InstanceSettings,
}

impl LspServerInstance {
    /// Spawn the server for `language` in `root` and run the handshake.
    ///
    /// # Errors
    /// `ServerUnavailable` when the command is not on `PATH`, `Spawn` when
    /// the process fails to start, handshake errors otherwise. A failed
    /// handshake kills the process.
    pub async fn spawn(
        language: &str,
        config: &LspServerConfig,
        root: &Path,
        settings: InstanceSettings,
    ) -> Result<Arc<Self>, LspError> {
        let program = which::which(&config.command)
            .map_err(|_| LspError::ServerUnavailable(config.command.clone()))?;

        let mut child = Command::new(&program)
            .args(&config.args)
            .envs(&config.env)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LspError::Spawn {
                command: program.display().to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LspError::Transport("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LspError::Transport("child stdout unavailable".to_string()))?;
        let stderr = child.stderr.take();

        tracing::info!(
            event = "loom.lsp.server.spawned",
            language,
            command = %program.display(),
            pid = child.id(),
            "language server spawned"
        );

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (diagnostics_tx, _) = broadcast::channel(DIAGNOSTICS_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let health = Arc::new(Mutex::new(HealthState {
            status: ServerStatus::Starting,
            strikes: 0,
            last_error: None,
            alive: true,
        }));

        let mut tasks = vec![
            tokio::spawn(writer_loop(stdin, outgoing_rx, errors_tx.clone())),
            tokio::spawn(reader_loop(
                stdout,
                dispatch_tx.clone(),
                diagnostics_tx.clone(),
                errors_tx.clone(),
            )),
            tokio::spawn(dispatcher_loop(
                language.to_string(),
                dispatch_rx,
                errors_rx,
                outgoing_tx.clone(),
                Arc::clone(&health),
                shutdown_rx,
            )),
        ];
        if let Some(stderr) = stderr {
            tasks.push(tokio::spawn(stderr_drain(language.to_string(), stderr)));
        }

        let instance = Arc::new(Self {
            language: language.to_string(),
            command: config.command.clone(),
            outgoing: outgoing_tx,
            dispatch: dispatch_tx,
            diagnostics: diagnostics_tx,
            shutdown_tx,
            health,
            next_id: AtomicI64::new(1),
            next_version: AtomicI64::new(1),
            capabilities: OnceLock::new(),
            child: tokio::sync::Mutex::new(Some(child)),
            tasks: Mutex::new(tasks),
            settings,
        });

        if let Err(err) = instance.initialize(root, config.init_options.clone()).await {
            tracing::warn!(
                event = "loom.lsp.server.init_failed",
                language,
                error = %err,
                "language server handshake failed"
            );
            instance.shutdown().await;
            return Err(err);
        }
        Ok(instance)
    }

    /// Language key.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Configured command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Server capabilities from the `initialize` result.
    #[must_use]
    pub fn capabilities(&self) -> Option<&Value> {
        self.capabilities.get()
    }

    /// Health snapshot.
    #[must_use]
    pub fn health(&self) -> ServerHealth {
        let state = self.lock_health();
        ServerHealth {
            language: self.language.clone(),
            command: self.command.clone(),
            status: state.status,
            strikes: state.strikes,
            last_error: state.last_error.clone(),
        }
    }

    /// Alive, not shut down, and under the strike limit.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let state = self.lock_health();
        state.alive
            && state.status != ServerStatus::Shutdown
            && state.strikes < self.settings.max_strikes
    }

    /// Send a request and wait for its response.
    ///
    /// On timeout the pending entry is cancelled and a strike recorded; the
    /// process keeps running.
    ///
    /// # Errors
    /// `Timeout`, `Rpc`, or `Shutdown` when the instance is gone.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, LspError> {
        if !self.lock_health().alive {
            return Err(LspError::Shutdown);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (reply, rx) = oneshot::channel();
        self.dispatch
            .send(DispatchEvent::Register { id, reply })
            .map_err(|_| LspError::Shutdown)?;
        self.outgoing
            .send(protocol::request(id, method, params))
            .map_err(|_| LspError::Shutdown)?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => {
                if result.is_ok() {
                    self.record_success();
                }
                result
            }
            Ok(Err(_)) => Err(LspError::Shutdown),
            Err(_) => {
                let _ = self.dispatch.send(DispatchEvent::Cancel { id });
                self.record_strike(format!("{method} timed out"));
                Err(LspError::Timeout(method.to_string()))
            }
        }
    }

    /// Send a notification.
    ///
    /// # Errors
    /// `Shutdown` when the writer is gone.
    pub fn notify(&self, method: &str, params: Value) -> Result<(), LspError> {
        self.outgoing
            .send(protocol::notification(method, params))
            .map_err(|_| LspError::Shutdown)
    }

    /// Open `text` as `path`, wait up to `wait` for its diagnostics, then
    /// close it. `Ok(None)` when the window expires (a strike is recorded).
    ///
    /// # Errors
    /// `InvalidPath` for relative paths, `Shutdown` when the instance dies.
    pub async fn collect_diagnostics(
        &self,
        path: &Path,
        language_id: &str,
        text: &str,
        wait: Duration,
    ) -> Result<Option<Vec<Diagnostic>>, LspError> {
        let uri = protocol::path_to_uri(path)?;
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.diagnostics.subscribe();
        let deadline = tokio::time::Instant::now() + wait;

        self.notify(
            protocol::DID_OPEN,
            json!({"textDocument": {
                "uri": uri,
                "languageId": language_id,
                "version": version,
                "text": text,
            }}),
        )?;

        let outcome = loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Ok(params)) => {
                    let stale = params.version.is_some_and(|v| v != version);
                    if protocol::uris_match(&params.uri, &uri) && !stale {
                        break Ok(Some(params.diagnostics));
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    tracing::debug!(
                        event = "loom.lsp.diagnostics.lagged",
                        language = %self.language,
                        skipped,
                        "diagnostics receiver lagged"
                    );
                }
                Ok(Err(RecvError::Closed)) => break Err(LspError::Shutdown),
                Err(_) => break Ok(None),
            }
        };

        match &outcome {
            Ok(Some(_)) => self.record_success(),
            Ok(None) => self.record_strike(format!("no diagnostics for {uri} within {wait:?}")),
            Err(_) => {}
        }

        if let Err(err) = self.notify(
            protocol::DID_CLOSE,
            json!({"textDocument": {"uri": uri}}),
        ) {
            tracing::debug!(
                event = "loom.lsp.document.close_failed",
                language = %self.language,
                error = %err,
                "didClose not sent"
            );
        }
        outcome
    }

    /// Graceful shutdown: `shutdown` request, `exit`, grace wait, kill.
    /// Idempotent.
    pub async fn shutdown(&self) {
        let was_alive = {
            let mut state = self.lock_health();
            if state.status == ServerStatus::Shutdown {
                return;
            }
            state.status = ServerStatus::Shutdown;
            state.alive
        };

        if was_alive {
            let timeout = SHUTDOWN_REQUEST_TIMEOUT.min(self.settings.request_timeout);
            if let Err(err) = self
                .request(protocol::SHUTDOWN, Value::Null, timeout)
                .await
            {
                tracing::debug!(
                    event = "loom.lsp.server.shutdown_request_failed",
                    language = %self.language,
                    error = %err,
                    "shutdown request failed"
                );
            }
            let _ = self.notify(protocol::EXIT, Value::Null);
        }

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(self.settings.shutdown_grace, child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(
                        event = "loom.lsp.server.exited",
                        language = %self.language,
                        status = %status,
                        "language server exited"
                    );
                }
                _ => {
                    if let Err(err) = child.kill().await {
                        tracing::warn!(
                            event = "loom.lsp.server.kill_failed",
                            language = %self.language,
                            error = %err,
                            "failed to kill language server"
                        );
                    }
                }
            }
        }

        self.lock_health().alive = false;
        let _ = self.shutdown_tx.send(true);
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
        tracing::info!(
            event = "loom.lsp.server.shutdown",
            language = %self.language,
            "language server shut down"
        );
    }

    async fn initialize(&self, root: &Path, init_options: Option<Value>) -> Result<(), LspError> {
        let params = protocol::initialize_params(root, init_options)?;
        let result = self
            .request(protocol::INITIALIZE, params, self.settings.request_timeout)
            .await?;
        let capabilities = result.get("capabilities").cloned().unwrap_or(Value::Null);
        let _ = self.capabilities.set(capabilities);
        self.notify(protocol::INITIALIZED, json!({}))?;
        self.lock_health().status = ServerStatus::Initialized;
        tracing::info!(
            event = "loom.lsp.server.initialized",
            language = %self.language,
            "language server initialized"
        );
        Ok(())
    }

    fn record_success(&self) {
        let mut state = self.lock_health();
        state.strikes = 0;
        if matches!(
            state.status,
            ServerStatus::Initialized | ServerStatus::Degraded
        ) {
            state.status = ServerStatus::Healthy;
        }
    }

    fn record_strike(&self, reason: String) {
        let mut state = self.lock_health();
        state.strikes += 1;
        if state.status != ServerStatus::Shutdown && state.status != ServerStatus::Starting {
            state.status = ServerStatus::Degraded;
        }
        tracing::warn!(
            event = "loom.lsp.server.strike",
            language = %self.language,
            strikes = state.strikes,
            reason = %reason,
            "language server strike"
        );
        state.last_error = Some(reason);
    }

    fn lock_health(&self) -> MutexGuard<'_, HealthState> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for LspServerInstance {
    fn drop(&mut self) {
        for task in self.lock_tasks().drain(..) {
            task.abort();
        }
    }
}

impl fmt::Debug for LspServerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LspServerInstance")
            .field("language", &self.language)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

async fn writer_loop(
    mut stdin: ChildStdin,
    mut outgoing: mpsc::UnboundedReceiver<Value>,
    errors: mpsc::UnboundedSender<LspError>,
) {
    while let Some(message) = outgoing.recv().await {
        let frame = match encode_message(&message) {
            Ok(frame) => frame,
            Err(err) => {
                let _ = errors.send(err);
                continue;
            }
        };
        let written = async {
            stdin.write_all(&frame).await?;
            stdin.flush().await
        }
        .await;
        if let Err(err) = written {
            let _ = errors.send(LspError::Transport(format!("write: {err}")));
            break;
        }
    }
}

async fn reader_loop(
    stdout: ChildStdout,
    dispatch: mpsc::UnboundedSender<DispatchEvent>,
    diagnostics: broadcast::Sender<PublishDiagnosticsParams>,
    errors: mpsc::UnboundedSender<LspError>,
) {
    let mut reader = BufReader::new(stdout);
    loop {
        let message = match read_message(&mut reader).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                let _ = dispatch.send(DispatchEvent::Closed {
                    reason: "server closed stdout".to_string(),
                });
                return;
            }
            Err(err @ LspError::Json(_)) => {
                let _ = errors.send(err);
                continue;
            }
            Err(err) => {
                let _ = dispatch.send(DispatchEvent::Closed {
                    reason: err.to_string(),
                });
                return;
            }
        };

        let event = match protocol::classify(message) {
            Ok(Incoming::Response { id, result }) => DispatchEvent::Response { id, result },
            Ok(Incoming::Request { id, method, params }) => {
                DispatchEvent::ServerRequest { id, method, params }
            }
            Ok(Incoming::Notification { method, params })
                if method == protocol::PUBLISH_DIAGNOSTICS =>
            {
                match serde_json::from_value::<PublishDiagnosticsParams>(params) {
                    Ok(published) => {
                        // No subscribers simply means nobody is waiting.
                        let _ = diagnostics.send(published);
                    }
                    Err(err) => {
                        let _ = errors.send(LspError::Json(err));
                    }
                }
                continue;
            }
            Ok(Incoming::Notification { method, params }) => {
                DispatchEvent::Notification { method, params }
            }
            Err(err) => {
                let _ = errors.send(err);
                continue;
            }
        };
        if dispatch.send(event).is_err() {
            return;
        }
    }
}

async fn dispatcher_loop(
    language: String,
    mut events: mpsc::UnboundedReceiver<DispatchEvent>,
    mut errors: mpsc::UnboundedReceiver<LspError>,
    outgoing: mpsc::UnboundedSender<Value>,
    health: Arc<Mutex<HealthState>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut pending: HashMap<i64, oneshot::Sender<Result<Value, LspError>>> = HashMap::new();

    loop {
        tokio::select! {
            Some(event) = events.recv() => match event {
                DispatchEvent::Register { id, reply } => {
                    pending.insert(id, reply);
                }
                DispatchEvent::Cancel { id } => {
                    pending.remove(&id);
                }
                DispatchEvent::Response { id, result } => match pending.remove(&id) {
                    Some(reply) => {
                        let _ = reply.send(result.map_err(LspError::from));
                    }
                    None => tracing::debug!(
                        event = "loom.lsp.dispatch.unmatched",
                        language = %language,
                        id,
                        "response for unknown or cancelled request"
                    ),
                },
                DispatchEvent::ServerRequest { id, method, params } => {
                    let result = protocol::answer_server_request(&method, &params);
                    tracing::debug!(
                        event = "loom.lsp.dispatch.server_request",
                        language = %language,
                        method = %method,
                        "answered server request"
                    );
                    let _ = outgoing.send(protocol::response(id, result));
                }
                DispatchEvent::Notification { method, params } => {
                    let message = params.get("message").and_then(Value::as_str).unwrap_or("");
                    tracing::debug!(
                        event = "loom.lsp.dispatch.notification",
                        language = %language,
                        method = %method,
                        text = message,
                        "server notification"
                    );
                }
                DispatchEvent::Closed { reason } => {
                    tracing::warn!(
                        event = "loom.lsp.server.closed",
                        language = %language,
                        reason = %reason,
                        "language server connection closed"
                    );
                    {
                        let mut state = health.lock().unwrap_or_else(PoisonError::into_inner);
                        state.alive = false;
                        state.last_error = Some(reason.clone());
                    }
                    for (_, reply) in pending.drain() {
                        let _ = reply.send(Err(LspError::Transport(reason.clone())));
                    }
                    return;
                }
            },
            Some(err) = errors.recv() => {
                tracing::warn!(
                    event = "loom.lsp.transport.error",
                    language = %language,
                    error = %err,
                    "language server transport error"
                );
                health.lock().unwrap_or_else(PoisonError::into_inner).last_error = Some(err.to_string());
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    for (_, reply) in pending.drain() {
                        let _ = reply.send(Err(LspError::Shutdown));
                    }
                    return;
                }
            }
            else => return,
        }
    }
}

async fn stderr_drain(language: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(
            event = "loom.lsp.server.stderr",
            language = %language,
            line = %line,
            "server stderr"
        );
    }
}
