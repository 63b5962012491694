//! voxlink — realtime conversational-audio session client.
//!
//! Opens one persistent WebSocket to an OpenAI-Realtime-style endpoint,
//! speaks its JSON event protocol, and multiplexes an outbound
//! microphone-capture stream with the inbound synthesized-speech stream.
//! Turn-taking is enforced: captured audio is never transmitted while the
//! assistant is speaking.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxlink::{RealtimeClient, SessionConfig, SessionHooks};
//!
//! # async fn example() -> voxlink::Result<()> {
//! let mut client = RealtimeClient::new(SessionConfig::default());
//! let hooks = SessionHooks::new(
//!     |buf| capture_microphone(buf),
//!     |chunk, is_last| play_speaker(chunk, is_last),
//! )
//! .on_connected(|| println!("live"));
//! client.start(hooks)?;
//! // ... later
//! client.stop();
//! # Ok(())
//! # }
//! # fn capture_microphone(_buf: &mut [u8]) -> usize { 0 }
//! # fn play_speaker(_chunk: &[u8], _is_last: bool) {}
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;

pub use config::{available_models, AudioFormat, ModelInfo, SessionConfig, TurnDetection};
pub use error::{Result, VoxlinkError};
pub use protocol::ServerEvent;
pub use session::{RealtimeClient, SessionHooks, SessionState};
pub use tools::{ToolDefinition, ToolInvocation, ToolResult, ToolResultStatus};
pub use transport::{Transport, TransportFrame, WsTransport};
