//! The session worker: one cooperative loop that multiplexes protocol
//! polling, event dispatch, and the turn-gated audio capture pump.
//!
//! All session-state mutation happens here. The caller-facing API reaches
//! the worker only through the shutdown watch flag and the command channel.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::codec;
use crate::config::SessionConfig;
use crate::error::{Result, VoxlinkError};
use crate::protocol::{outbound, ServerEvent};
use crate::tools::{InvocationTable, ToolDefinition, ToolInvocation, ToolResult};
use crate::transport::{Transport, TransportFrame};

use super::state::SessionState;
use super::SessionHooks;

/// Cross-context calls routed onto the worker loop.
pub(crate) enum Command {
    RegisterTool(ToolDefinition),
    SubmitToolResult {
        result: ToolResult,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Bounds on per-iteration work, so shutdown stays responsive.
const MAX_FRAMES_PER_TICK: usize = 32;
const MAX_COMMANDS_PER_TICK: usize = 8;

pub(crate) struct Worker {
    transport: Box<dyn Transport>,
    config: SessionConfig,
    auth_header: String,
    tools: Vec<ToolDefinition>,
    hooks: SessionHooks,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    shutdown_rx: watch::Receiver<bool>,
    commands_rx: mpsc::UnboundedReceiver<Command>,
    capture_buf: Vec<u8>,
    assistant_speaking: bool,
    /// A response's audio reached the sink and no terminal chunk followed yet.
    sink_open: bool,
    consecutive_decode_failures: u32,
    invocations: InvocationTable,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        config: SessionConfig,
        auth_header: String,
        tools: Vec<ToolDefinition>,
        hooks: SessionHooks,
        state_tx: watch::Sender<SessionState>,
        shutdown_rx: watch::Receiver<bool>,
        commands_rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let capture_buf = vec![0u8; config.frame_bytes];
        Self {
            transport,
            config,
            auth_header,
            tools,
            hooks,
            state: SessionState::Idle,
            state_tx,
            shutdown_rx,
            commands_rx,
            capture_buf,
            assistant_speaking: false,
            sink_open: false,
            consecutive_decode_failures: 0,
            invocations: InvocationTable::default(),
        }
    }

    pub(crate) async fn run(mut self) {
        match self.run_session().await {
            Ok(()) => {
                self.set_state(SessionState::Closing);
                self.transport.disconnect().await;
                if self.sink_open {
                    self.emit_terminal();
                }
                self.set_state(SessionState::Closed);
                info!("session closed");
            }
            Err(error) => {
                warn!(error = %error, "session failed");
                self.transport.disconnect().await;
                self.emit_terminal();
                if let Some(on_error) = self.hooks.on_error.as_mut() {
                    on_error(&error);
                }
                self.set_state(SessionState::Error);
            }
        }
    }

    async fn run_session(&mut self) -> Result<()> {
        self.set_state(SessionState::Connecting);
        let url = self.config.endpoint_url();
        self.transport.connect(&url, &self.auth_header).await?;

        self.set_state(SessionState::AwaitingSessionAck);
        let hello = outbound::session_update(&self.config, &self.tools);
        self.transport.send_text(&hello).await?;
        debug!(model = %self.config.model, "session configuration sent");

        loop {
            if *self.shutdown_rx.borrow() {
                return Ok(());
            }

            self.drain_commands().await?;

            for frame in self.transport.poll(MAX_FRAMES_PER_TICK).await? {
                let event = match frame {
                    TransportFrame::Text(payload) => ServerEvent::decode(&payload),
                    TransportFrame::Closed => ServerEvent::Disconnected,
                };
                self.apply(event)?;
            }

            self.pump_audio().await?;

            tokio::task::yield_now().await;
        }
    }

    /// Apply one decoded inbound event to the session.
    fn apply(&mut self, event: ServerEvent) -> Result<()> {
        if !matches!(event, ServerEvent::DecodeFailure { .. }) {
            self.consecutive_decode_failures = 0;
        }

        match event {
            ServerEvent::SessionCreated { session_id } => {
                info!(session_id = %session_id, "session created");
            }
            ServerEvent::SessionUpdated { session } => {
                if self.state == SessionState::AwaitingSessionAck {
                    self.set_state(SessionState::Active);
                    info!("session configuration acknowledged");
                    if let Some(on_connected) = self.hooks.on_connected.as_mut() {
                        on_connected();
                    }
                }
                if let Some(on_updated) = self.hooks.on_updated.as_mut() {
                    on_updated(&session);
                }
            }
            ServerEvent::ResponseCreated => {
                self.assistant_speaking = true;
                debug!("assistant response started");
            }
            ServerEvent::ResponseDone => {
                self.assistant_speaking = false;
                self.emit_terminal();
                debug!("assistant response finished");
            }
            ServerEvent::AudioDelta { delta } => {
                if self.state == SessionState::Active {
                    let bytes = codec::decode(&delta);
                    self.sink_open = true;
                    (self.hooks.sink)(&bytes, false);
                } else {
                    debug!("audio delta before activation dropped");
                }
            }
            ServerEvent::AudioDone => {
                // Terminal for the speaking gate only; the sink's terminal
                // chunk is tied to response.done.
                self.assistant_speaking = false;
                debug!("assistant audio finished");
            }
            ServerEvent::TextDelta { text } => {
                trace!(text = %text, "text delta");
            }
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                let invocation = ToolInvocation {
                    call_id,
                    name,
                    arguments,
                };
                info!(call_id = %invocation.call_id, tool = %invocation.name, "tool call requested");
                self.invocations.begin(invocation.clone());
                if let Some(on_tool_call) = self.hooks.on_tool_call.as_mut() {
                    on_tool_call(invocation);
                }
            }
            ServerEvent::SpeechStarted => {
                debug!("caller speech started");
            }
            ServerEvent::SpeechStopped => {
                debug!("caller speech stopped");
            }
            ServerEvent::ServiceError { code, message } => {
                warn!(
                    code = code.as_deref().unwrap_or("unknown"),
                    message = %message,
                    "service reported an error"
                );
                if let Some(on_error) = self.hooks.on_error.as_mut() {
                    on_error(&VoxlinkError::Service { code, message });
                }
            }
            ServerEvent::Disconnected => {
                if *self.shutdown_rx.borrow() {
                    debug!("peer closed during shutdown");
                } else {
                    return Err(VoxlinkError::Transport(
                        "Connection closed by peer".into(),
                    ));
                }
            }
            ServerEvent::Routine { event_type } => {
                trace!(event_type = %event_type, "housekeeping event");
            }
            ServerEvent::DecodeFailure { message } => {
                self.consecutive_decode_failures += 1;
                warn!(
                    failures = self.consecutive_decode_failures,
                    message = %message,
                    "malformed inbound message discarded"
                );
                if self.consecutive_decode_failures > self.config.decode_failure_tolerance {
                    return Err(VoxlinkError::Transport(
                        "Repeated decode failures exceeded tolerance".into(),
                    ));
                }
            }
            ServerEvent::Unrecognized { event_type, .. } => {
                warn!(event_type = %event_type, "unrecognized message ignored");
            }
        }
        Ok(())
    }

    /// Pull one capture chunk and transmit it, subject to the turn-taking
    /// gate. A zero-byte read means the source has nothing this tick.
    async fn pump_audio(&mut self) -> Result<()> {
        if self.state != SessionState::Active || self.assistant_speaking {
            return Ok(());
        }
        let read = (self.hooks.source)(&mut self.capture_buf);
        if read == 0 {
            return Ok(());
        }
        let read = read.min(self.capture_buf.len());
        let encoded = codec::encode(&self.capture_buf[..read]);
        self.transport
            .send_text(&outbound::audio_append(&encoded))
            .await?;
        trace!(bytes = read, "audio frame sent");
        Ok(())
    }

    async fn drain_commands(&mut self) -> Result<()> {
        for _ in 0..MAX_COMMANDS_PER_TICK {
            match self.commands_rx.try_recv() {
                Ok(Command::RegisterTool(definition)) => {
                    info!(tool = %definition.name, "tool registered mid-session");
                    self.tools.push(definition);
                    let message = outbound::tools_update(&self.tools);
                    self.transport.send_text(&message).await?;
                }
                Ok(Command::SubmitToolResult { result, reply }) => {
                    self.handle_tool_result(result, reply).await?;
                }
                Err(_) => break,
            }
        }
        Ok(())
    }

    async fn handle_tool_result(
        &mut self,
        result: ToolResult,
        reply: oneshot::Sender<Result<()>>,
    ) -> Result<()> {
        let Some(invocation) = self.invocations.resolve(&result.call_id) else {
            warn!(call_id = %result.call_id, "tool result for unknown invocation rejected");
            let _ = reply.send(Err(VoxlinkError::UnknownToolCall(result.call_id)));
            return Ok(());
        };

        let output = result.wire_output();
        let transmit: Result<()> = async {
            self.transport
                .send_text(&outbound::tool_output(&result.call_id, &output))
                .await?;
            self.transport
                .send_text(&outbound::response_trigger())
                .await?;
            Ok(())
        }
        .await;

        match transmit {
            Ok(()) => {
                info!(call_id = %result.call_id, tool = %invocation.name, "tool result submitted");
                let _ = reply.send(Ok(()));
                Ok(())
            }
            Err(error) => {
                let _ = reply.send(Err(VoxlinkError::Transport(error.to_string())));
                Err(error)
            }
        }
    }

    /// Zero-length chunk with the terminal flag, so the caller can release
    /// playback buffers deterministically.
    fn emit_terminal(&mut self) {
        (self.hooks.sink)(&[], true);
        self.sink_open = false;
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        let _ = self.state_tx.send(state);
    }
}
