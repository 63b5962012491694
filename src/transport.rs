//! Duplex transport: the abstract connection contract and the concrete TLS
//! WebSocket implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::error::{Result, VoxlinkError};

/// One inbound delivery from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    Text(String),
    /// The peer closed the connection or it was lost.
    Closed,
}

/// Abstract duplex connection to the remote service.
///
/// The session core assumes only that frames arrive in receipt order and
/// that `send_text` means "accepted for transmission". `poll` must bound its
/// own work: it returns at most `max_frames` frames and never waits past a
/// small internal window.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self, url: &str, auth_header: &str) -> Result<()>;
    async fn send_text(&mut self, payload: &str) -> Result<()>;
    async fn poll(&mut self, max_frames: usize) -> Result<Vec<TransportFrame>>;
    fn is_connected(&self) -> bool;
    async fn disconnect(&mut self);
}

type WsSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// TLS WebSocket transport.
pub struct WsTransport {
    socket: Option<WsSocket>,
    poll_window: Duration,
}

impl WsTransport {
    pub fn new(poll_window: Duration) -> Self {
        Self {
            socket: None,
            poll_window,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&mut self, url: &str, auth_header: &str) -> Result<()> {
        if self.socket.is_some() {
            return Err(VoxlinkError::InvalidState(
                "Transport is already connected".into(),
            ));
        }

        let mut request = url.into_client_request().map_err(|error| {
            VoxlinkError::Configuration(format!("Invalid websocket URL: {error}"))
        })?;
        let auth_value = HeaderValue::from_str(auth_header).map_err(|error| {
            VoxlinkError::Configuration(format!("Invalid auth header: {error}"))
        })?;
        request.headers_mut().insert("Authorization", auth_value);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (socket, _) = connect_async(request).await.map_err(map_connect_error)?;
        self.socket = Some(socket);
        Ok(())
    }

    async fn send_text(&mut self, payload: &str) -> Result<()> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(VoxlinkError::Transport("Transport is not connected".into()));
        };
        if let Err(error) = socket.send(Message::Text(payload.into())).await {
            self.socket = None;
            return Err(VoxlinkError::Transport(format!(
                "Websocket send failed: {error}"
            )));
        }
        Ok(())
    }

    async fn poll(&mut self, max_frames: usize) -> Result<Vec<TransportFrame>> {
        let Some(socket) = self.socket.as_mut() else {
            return Ok(vec![TransportFrame::Closed]);
        };

        let mut frames = Vec::new();
        let mut closed = false;
        let mut failure = None;
        let deadline = Instant::now() + self.poll_window;

        while frames.len() < max_frames {
            let remaining = deadline.duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match timeout(remaining, socket.next()).await {
                Err(_) => break,
                Ok(None) => {
                    frames.push(TransportFrame::Closed);
                    closed = true;
                    break;
                }
                Ok(Some(Ok(message))) => match message {
                    Message::Text(text) => frames.push(TransportFrame::Text(text.to_string())),
                    Message::Binary(bytes) => {
                        // Some peers deliver JSON frames as binary.
                        if let Ok(text) = String::from_utf8(bytes.to_vec()) {
                            frames.push(TransportFrame::Text(text));
                        }
                    }
                    Message::Ping(payload) => {
                        if let Err(error) = socket.send(Message::Pong(payload)).await {
                            failure = Some(format!("Websocket pong failed: {error}"));
                            break;
                        }
                    }
                    Message::Pong(_) | Message::Frame(_) => {}
                    Message::Close(_) => {
                        frames.push(TransportFrame::Closed);
                        closed = true;
                        break;
                    }
                },
                Ok(Some(Err(error))) => {
                    failure = Some(format!("Websocket receive failed: {error}"));
                    break;
                }
            }
        }

        if closed || failure.is_some() {
            self.socket = None;
        }
        match failure {
            Some(message) => Err(VoxlinkError::Transport(message)),
            None => Ok(frames),
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None).await;
        }
    }
}

fn map_connect_error(error: WsError) -> VoxlinkError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if matches!(status, 401 | 403) {
                VoxlinkError::Authentication(format!(
                    "Websocket handshake rejected with status {status}"
                ))
            } else {
                VoxlinkError::Transport(format!(
                    "Websocket handshake failed with status {status}"
                ))
            }
        }
        WsError::Io(error) => VoxlinkError::Io(error),
        WsError::Url(error) => {
            VoxlinkError::Configuration(format!("Invalid websocket URL: {error}"))
        }
        other => VoxlinkError::Transport(format!("Websocket connect failed: {other}")),
    }
}
