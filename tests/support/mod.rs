//! Shared test support: a scripted in-memory transport standing in for the
//! TLS WebSocket, so session behavior can be driven deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use voxlink::{Result, Transport, TransportFrame, VoxlinkError};

#[derive(Default)]
struct Inner {
    connected: bool,
    fail_connect: bool,
    connect_url: Option<String>,
    auth_header: Option<String>,
    inbound: VecDeque<TransportFrame>,
    sent: Vec<String>,
}

/// Test-side handle to a [`FakeTransport`]. Clones share state, so the test
/// keeps one while the session worker owns the transport.
#[derive(Clone, Default)]
pub struct FakeTransportHandle {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTransportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> Box<dyn Transport> {
        Box::new(FakeTransport {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn refuse_connect(&self) {
        self.lock().fail_connect = true;
    }

    /// Queue one inbound text frame for the next poll.
    pub fn inject(&self, payload: &str) {
        self.lock()
            .inbound
            .push_back(TransportFrame::Text(payload.to_string()));
    }

    /// Queue a connection-closed notification.
    pub fn inject_close(&self) {
        self.lock().inbound.push_back(TransportFrame::Closed);
    }

    pub fn connect_url(&self) -> Option<String> {
        self.lock().connect_url.clone()
    }

    pub fn auth_header(&self) -> Option<String> {
        self.lock().auth_header.clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// The `type` field of every transmitted message, in order.
    pub fn sent_types(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .map(|payload| {
                serde_json::from_str::<Value>(payload)
                    .ok()
                    .and_then(|v| v["type"].as_str().map(ToString::to_string))
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn sent_count_of(&self, message_type: &str) -> usize {
        self.sent_types()
            .iter()
            .filter(|t| t.as_str() == message_type)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake transport lock should not poison")
    }
}

pub struct FakeTransport {
    inner: Arc<Mutex<Inner>>,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&mut self, url: &str, auth_header: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("lock should not poison");
        if inner.fail_connect {
            return Err(VoxlinkError::Transport("connection refused".into()));
        }
        inner.connected = true;
        inner.connect_url = Some(url.to_string());
        inner.auth_header = Some(auth_header.to_string());
        Ok(())
    }

    async fn send_text(&mut self, payload: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("lock should not poison");
        if !inner.connected {
            return Err(VoxlinkError::Transport("not connected".into()));
        }
        inner.sent.push(payload.to_string());
        Ok(())
    }

    async fn poll(&mut self, max_frames: usize) -> Result<Vec<TransportFrame>> {
        let frames = {
            let mut inner = self.inner.lock().expect("lock should not poison");
            let take = inner.inbound.len().min(max_frames);
            inner.inbound.drain(..take).collect::<Vec<_>>()
        };
        if frames.is_empty() {
            // Pace the worker loop the way the real transport's poll window does.
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(frames)
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().expect("lock should not poison").connected
    }

    async fn disconnect(&mut self) {
        self.inner.lock().expect("lock should not poison").connected = false;
    }
}
