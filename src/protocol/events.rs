//! Inbound session events.

use serde_json::Value;

/// One inbound protocol message, decoded into the closed set of kinds the
/// session controller handles.
///
/// Decoding is total: malformed JSON becomes [`ServerEvent::DecodeFailure`]
/// and unknown message types become [`ServerEvent::Unrecognized`] rather
/// than failing the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SessionCreated {
        session_id: String,
    },
    SessionUpdated {
        session: Value,
    },
    ResponseCreated,
    ResponseDone,
    /// Base64-encoded synthesized-speech slice.
    AudioDelta {
        delta: String,
    },
    AudioDone,
    TextDelta {
        text: String,
    },
    FunctionCallArgumentsDone {
        call_id: String,
        name: String,
        arguments: String,
    },
    SpeechStarted,
    SpeechStopped,
    ServiceError {
        code: Option<String>,
        message: String,
    },
    /// Transport closed; synthesized by the worker, never parsed from JSON.
    Disconnected,
    /// Known housekeeping kinds that need no handling beyond a trace line.
    Routine {
        event_type: String,
    },
    DecodeFailure {
        message: String,
    },
    Unrecognized {
        event_type: String,
        raw: Value,
    },
}

impl ServerEvent {
    /// Decode one raw transport payload.
    pub fn decode(payload: &str) -> Self {
        let value = match serde_json::from_str::<Value>(payload) {
            Ok(value) => value,
            Err(error) => {
                return Self::DecodeFailure {
                    message: error.to_string(),
                }
            }
        };
        Self::from_payload(value)
    }

    fn from_payload(payload: Value) -> Self {
        let Some(event_type) = payload.get("type").and_then(Value::as_str) else {
            return Self::DecodeFailure {
                message: "message has no type field".to_string(),
            };
        };

        match event_type {
            "session.created" => Self::SessionCreated {
                session_id: string_at(&payload, &["session", "id"])
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            "session.updated" => Self::SessionUpdated {
                session: payload.get("session").cloned().unwrap_or(Value::Null),
            },
            "response.created" => Self::ResponseCreated,
            "response.done" => Self::ResponseDone,
            "response.audio.delta" | "response.output_audio.delta" => {
                match string_field(&payload, "delta") {
                    Some(delta) => Self::AudioDelta { delta },
                    None => Self::DecodeFailure {
                        message: format!("{event_type} carries no delta"),
                    },
                }
            }
            "response.audio.done" | "response.output_audio.done" => Self::AudioDone,
            "response.text.delta"
            | "response.output_text.delta"
            | "response.audio_transcript.delta"
            | "response.output_audio_transcript.delta" => {
                match string_field(&payload, "delta") {
                    Some(text) => Self::TextDelta { text },
                    None => Self::DecodeFailure {
                        message: format!("{event_type} carries no delta"),
                    },
                }
            }
            "response.function_call_arguments.done" => Self::FunctionCallArgumentsDone {
                call_id: string_field(&payload, "call_id").unwrap_or_default(),
                name: string_field(&payload, "name").unwrap_or_default(),
                arguments: string_field(&payload, "arguments").unwrap_or_default(),
            },
            "input_audio_buffer.speech_started" => Self::SpeechStarted,
            "input_audio_buffer.speech_stopped" => Self::SpeechStopped,
            "error" => Self::ServiceError {
                code: string_at(&payload, &["error", "code"]),
                message: string_at(&payload, &["error", "message"])
                    .or_else(|| string_field(&payload, "message"))
                    .unwrap_or_else(|| "unknown service error".to_string()),
            },
            "response.output_item.added"
            | "response.output_item.done"
            | "response.content_part.added"
            | "response.content_part.done"
            | "response.text.done"
            | "response.audio_transcript.done"
            | "response.output_audio_transcript.done"
            | "conversation.item.added"
            | "conversation.item.created"
            | "conversation.item.done"
            | "input_audio_buffer.committed"
            | "rate_limits.updated" => Self::Routine {
                event_type: event_type.to_string(),
            },
            _ => Self::Unrecognized {
                event_type: event_type.to_string(),
                raw: payload,
            },
        }
    }
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str().map(ToString::to_string)
}
