//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Audio format for a realtime session.
///
/// `Pcm16` is 16-bit signed little-endian mono PCM at the service's fixed
/// sample rate; the format never changes mid-session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Pcm16,
    G711Ulaw,
    G711Alaw,
}

impl AudioFormat {
    /// Wire spelling used in the session-configuration message.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }
}

/// Server-side voice-activity-detection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnDetection {
    /// Activation sensitivity in `[0.0, 1.0]`.
    pub threshold: f64,
    /// Audio included before detected speech onset.
    pub prefix_padding_ms: u32,
    /// Silence needed before the server considers the turn finished.
    pub silence_duration_ms: u32,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 1000,
        }
    }
}

/// A realtime model known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
}

const AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-realtime",
        display_name: "GPT-4 Realtime",
    },
    ModelInfo {
        id: "gpt-realtime-mini",
        display_name: "GPT Realtime Mini",
    },
    ModelInfo {
        id: "gpt-4o-realtime-preview",
        display_name: "GPT-4o Realtime Preview",
    },
    ModelInfo {
        id: "gpt-4o-mini-realtime-preview",
        display_name: "GPT-4o Mini Realtime Preview",
    },
];

/// Realtime models this client knows how to name.
pub fn available_models() -> &'static [ModelInfo] {
    AVAILABLE_MODELS
}

/// Configuration for a realtime audio session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// API credential. Falls back to `OPENAI_API_KEY` at start time.
    pub api_key: Option<String>,
    /// WebSocket endpoint; the model id is appended as a query parameter.
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub input_format: AudioFormat,
    pub output_format: AudioFormat,
    /// Model used for input-audio transcription, if any.
    pub transcription_model: Option<String>,
    pub turn_detection: TurnDetection,
    pub temperature: f64,
    pub max_response_output_tokens: u32,
    /// Capture chunk size the pump requests from the audio source.
    pub frame_bytes: usize,
    /// Upper bound on one transport poll; also paces the worker loop.
    pub poll_interval: Duration,
    /// Consecutive malformed inbound frames tolerated before the session
    /// is treated as disconnected.
    pub decode_failure_tolerance: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "wss://api.openai.com/v1/realtime".to_string(),
            model: "gpt-realtime-mini".to_string(),
            voice: "shimmer".to_string(),
            instructions: "You are a helpful assistant.".to_string(),
            input_format: AudioFormat::Pcm16,
            output_format: AudioFormat::Pcm16,
            transcription_model: Some("whisper-1".to_string()),
            turn_detection: TurnDetection::default(),
            temperature: 0.8,
            max_response_output_tokens: 4096,
            frame_bytes: 1536,
            poll_interval: Duration::from_millis(10),
            decode_failure_tolerance: 5,
        }
    }
}

impl SessionConfig {
    /// Full connection URL with the model id as a query parameter.
    pub fn endpoint_url(&self) -> String {
        let trimmed = self.base_url.trim();
        let separator = if trimmed.contains('?') { "&" } else { "?" };
        format!("{trimmed}{separator}model={}", self.model)
    }
}
