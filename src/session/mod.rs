//! Session controller: the caller-facing surface of a realtime session.

mod state;
mod worker;

pub use state::SessionState;

use std::env;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::error::{Result, VoxlinkError};
use crate::tools::{ToolDefinition, ToolInvocation, ToolResult};
use crate::transport::{Transport, WsTransport};

use worker::{Command, Worker};

/// Pulls one chunk of captured audio into the lent buffer and returns the
/// byte count. Must return immediately; zero means no audio this tick.
pub type AudioSource = Box<dyn FnMut(&mut [u8]) -> usize + Send>;

/// Receives synthesized-speech bytes. The second argument is the terminal
/// flag: a zero-length terminal chunk closes out the current response.
pub type AudioSink = Box<dyn FnMut(&[u8], bool) + Send>;

pub type ConnectedHook = Box<dyn FnMut() + Send>;
pub type UpdatedHook = Box<dyn FnMut(&Value) + Send>;
pub type ToolCallHook = Box<dyn FnMut(ToolInvocation) + Send>;
pub type ErrorHook = Box<dyn FnMut(&VoxlinkError) + Send>;

/// Data and event callbacks for one session run.
///
/// All of them execute synchronously on the session worker; none may block,
/// since that stalls both protocol processing and the turn-taking gate.
pub struct SessionHooks {
    pub(crate) source: AudioSource,
    pub(crate) sink: AudioSink,
    pub(crate) on_connected: Option<ConnectedHook>,
    pub(crate) on_updated: Option<UpdatedHook>,
    pub(crate) on_tool_call: Option<ToolCallHook>,
    pub(crate) on_error: Option<ErrorHook>,
}

impl SessionHooks {
    pub fn new(
        source: impl FnMut(&mut [u8]) -> usize + Send + 'static,
        sink: impl FnMut(&[u8], bool) + Send + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
            on_connected: None,
            on_updated: None,
            on_tool_call: None,
            on_error: None,
        }
    }

    /// Fires once, when the service acknowledges the session configuration.
    pub fn on_connected(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_connected = Some(Box::new(hook));
        self
    }

    /// Fires on every `session.updated`, with the session payload.
    pub fn on_updated(mut self, hook: impl FnMut(&Value) + Send + 'static) -> Self {
        self.on_updated = Some(Box::new(hook));
        self
    }

    /// Fires exactly once per requested function call.
    pub fn on_tool_call(mut self, hook: impl FnMut(ToolInvocation) + Send + 'static) -> Self {
        self.on_tool_call = Some(Box::new(hook));
        self
    }

    /// Fires on service-reported errors and on the terminal error path.
    pub fn on_error(mut self, hook: impl FnMut(&VoxlinkError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

struct Runtime {
    shutdown_tx: watch::Sender<bool>,
    commands_tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

/// A realtime audio session client. At most one session is live per client;
/// a second `start` while one is active fails rather than queuing.
pub struct RealtimeClient {
    config: SessionConfig,
    tools: Vec<ToolDefinition>,
    transport_override: Option<Box<dyn Transport>>,
    runtime: Option<Runtime>,
    state_rx: watch::Receiver<SessionState>,
}

impl RealtimeClient {
    pub fn new(config: SessionConfig) -> Self {
        let (_, state_rx) = watch::channel(SessionState::Idle);
        Self {
            config,
            tools: Vec::new(),
            transport_override: None,
            runtime: None,
            state_rx,
        }
    }

    /// Use a caller-supplied transport for the next session instead of the
    /// default TLS WebSocket.
    pub fn with_transport(config: SessionConfig, transport: Box<dyn Transport>) -> Self {
        let mut client = Self::new(config);
        client.transport_override = Some(transport);
        client
    }

    /// Start a session: validates configuration, spawns the worker, and
    /// returns immediately. The worker performs the handshake; observe
    /// progress through [`RealtimeClient::subscribe_state`] or the hooks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, hooks: SessionHooks) -> Result<()> {
        if self.runtime.is_some() && !self.state_rx.borrow().is_terminal() {
            return Err(VoxlinkError::InvalidState(
                "A session is already active".into(),
            ));
        }

        let api_key = resolve_api_key(&self.config)?;
        let auth_header = format!("Bearer {api_key}");
        let transport = self
            .transport_override
            .take()
            .unwrap_or_else(|| Box::new(WsTransport::new(self.config.poll_interval)));

        // The worker is live from this point on, so observers start at
        // Connecting rather than briefly reading Idle.
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(
            Worker::new(
                transport,
                self.config.clone(),
                auth_header,
                self.tools.clone(),
                hooks,
                state_tx,
                shutdown_rx,
                commands_rx,
            )
            .run(),
        );

        self.state_rx = state_rx;
        self.runtime = Some(Runtime {
            shutdown_tx,
            commands_tx,
            task,
        });
        Ok(())
    }

    /// Request shutdown. Idempotent and non-blocking: signals the worker
    /// and returns; the worker disconnects and reaches `Closed` on its own.
    pub fn stop(&self) {
        if let Some(runtime) = &self.runtime {
            let _ = runtime.shutdown_tx.send(true);
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state_rx.borrow().is_streaming()
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// Watch receiver over the session lifecycle, for callers that want to
    /// await particular states.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Declare a tool. Before `start` this only extends the registry; on a
    /// live session the updated registration is transmitted immediately.
    pub fn register_tool(&mut self, definition: ToolDefinition) {
        self.tools.push(definition.clone());
        if let Some(runtime) = &self.runtime {
            if self.state_rx.borrow().is_streaming() {
                let _ = runtime.commands_tx.send(Command::RegisterTool(definition));
            }
        }
    }

    /// Resolve an outstanding tool invocation. Transmits the result followed
    /// by a response trigger; fails with
    /// [`VoxlinkError::UnknownToolCall`] for a call id that was never issued
    /// or was already resolved, transmitting nothing.
    pub async fn submit_tool_result(&self, result: ToolResult) -> Result<()> {
        let runtime = self
            .runtime
            .as_ref()
            .filter(|_| !self.state_rx.borrow().is_terminal())
            .ok_or_else(|| VoxlinkError::InvalidState("No active session".into()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        runtime
            .commands_tx
            .send(Command::SubmitToolResult {
                result,
                reply: reply_tx,
            })
            .map_err(|_| VoxlinkError::InvalidState("Session worker has exited".into()))?;
        reply_rx
            .await
            .map_err(|_| VoxlinkError::InvalidState("Session worker has exited".into()))?
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.abort();
        }
    }
}

fn resolve_api_key(config: &SessionConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .or_else(|| env::var("OPENAI_API_KEY").ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| VoxlinkError::Authentication("No API credential configured".into()))
}
