//! Outbound message construction.
//!
//! Pure with respect to session state: these read configuration fields and
//! produce wire JSON, nothing else.

use serde_json::{json, Map, Value};

use crate::config::SessionConfig;
use crate::tools::ToolDefinition;

/// Full session-configuration message, sent once on entering the
/// awaiting-acknowledgment state and declaring any registered tools.
pub fn session_update(config: &SessionConfig, tools: &[ToolDefinition]) -> String {
    let mut session = Map::new();
    session.insert("modalities".into(), json!(["text", "audio"]));
    session.insert(
        "instructions".into(),
        Value::String(config.instructions.clone()),
    );
    session.insert("voice".into(), Value::String(config.voice.clone()));
    session.insert(
        "input_audio_format".into(),
        Value::String(config.input_format.as_wire_str().into()),
    );
    session.insert(
        "output_audio_format".into(),
        Value::String(config.output_format.as_wire_str().into()),
    );
    if let Some(model) = &config.transcription_model {
        session.insert(
            "input_audio_transcription".into(),
            json!({ "model": model }),
        );
    }
    session.insert(
        "turn_detection".into(),
        json!({
            "type": "server_vad",
            "threshold": config.turn_detection.threshold,
            "prefix_padding_ms": config.turn_detection.prefix_padding_ms,
            "silence_duration_ms": config.turn_detection.silence_duration_ms,
        }),
    );
    session.insert("temperature".into(), json!(config.temperature));
    session.insert(
        "max_response_output_tokens".into(),
        json!(config.max_response_output_tokens),
    );
    if !tools.is_empty() {
        session.insert("tools".into(), wire_tools(tools));
    }

    json!({ "type": "session.update", "session": Value::Object(session) }).to_string()
}

/// Tool-only configuration update, used for mid-session registration.
pub fn tools_update(tools: &[ToolDefinition]) -> String {
    json!({
        "type": "session.update",
        "session": { "tools": wire_tools(tools) },
    })
    .to_string()
}

/// One captured-audio frame, already base64-encoded by the codec.
pub fn audio_append(encoded: &str) -> String {
    json!({ "type": "input_audio_buffer.append", "audio": encoded }).to_string()
}

/// Tool-result submission for a resolved function call.
pub fn tool_output(call_id: &str, output: &str) -> String {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "function_call_output",
            "call_id": call_id,
            "output": output,
        },
    })
    .to_string()
}

/// Explicit "produce a response" trigger; the service does not resume
/// speaking after a tool result until asked.
pub fn response_trigger() -> String {
    json!({ "type": "response.create" }).to_string()
}

fn wire_tools(tools: &[ToolDefinition]) -> Value {
    Value::Array(tools.iter().map(ToolDefinition::to_wire).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(payload: &str) -> Value {
        serde_json::from_str(payload).expect("outbound payloads are valid JSON")
    }

    #[test]
    fn session_update_carries_configuration() {
        let config = SessionConfig::default();
        let message = parse(&session_update(&config, &[]));

        assert_eq!(message["type"], "session.update");
        let session = &message["session"];
        assert_eq!(session["voice"], "shimmer");
        assert_eq!(session["input_audio_format"], "pcm16");
        assert_eq!(session["output_audio_format"], "pcm16");
        assert_eq!(session["input_audio_transcription"]["model"], "whisper-1");
        assert_eq!(session["turn_detection"]["type"], "server_vad");
        assert_eq!(session["turn_detection"]["silence_duration_ms"], 1000);
        assert_eq!(session["max_response_output_tokens"], 4096);
        // No tools registered: the field is omitted entirely.
        assert!(session.get("tools").is_none());
    }

    #[test]
    fn session_update_declares_registered_tools() {
        let config = SessionConfig::default();
        let tools = vec![ToolDefinition::new(
            "lookup",
            "Look up a record",
            serde_json::json!({"type": "object", "properties": {}}),
        )];
        let message = parse(&session_update(&config, &tools));
        let wire_tools = message["session"]["tools"]
            .as_array()
            .expect("tools should be an array");
        assert_eq!(wire_tools.len(), 1);
        assert_eq!(wire_tools[0]["type"], "function");
        assert_eq!(wire_tools[0]["name"], "lookup");
    }

    #[test]
    fn tools_update_is_tool_only() {
        let tools = vec![ToolDefinition::new("lookup", "d", serde_json::json!({}))];
        let message = parse(&tools_update(&tools));
        assert_eq!(message["type"], "session.update");
        let session = message["session"]
            .as_object()
            .expect("session should be an object");
        assert_eq!(session.len(), 1);
        assert!(session.contains_key("tools"));
    }

    #[test]
    fn audio_append_wraps_encoded_frame() {
        let message = parse(&audio_append("UENNMTY="));
        assert_eq!(message["type"], "input_audio_buffer.append");
        assert_eq!(message["audio"], "UENNMTY=");
    }

    #[test]
    fn tool_output_then_trigger_shapes() {
        let result = parse(&tool_output("c1", "42"));
        assert_eq!(result["type"], "conversation.item.create");
        assert_eq!(result["item"]["type"], "function_call_output");
        assert_eq!(result["item"]["call_id"], "c1");
        assert_eq!(result["item"]["output"], "42");

        let trigger = parse(&response_trigger());
        assert_eq!(trigger["type"], "response.create");
    }
}
