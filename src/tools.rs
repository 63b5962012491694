//! Tool declarations and the outstanding-invocation table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A function the remote assistant may call.
///
/// Declared before the session starts (or mid-session, which re-sends the
/// registration) and immutable once sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the call arguments.
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Shape used inside the session-configuration `tools` array.
    pub(crate) fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
        })
    }
}

/// A function call requested by the remote assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    /// Raw JSON argument string as sent by the service.
    pub arguments: String,
}

/// Outcome of executing a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolResultStatus {
    Success,
    Failed,
}

/// The caller's answer to a [`ToolInvocation`], correlated by call id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub call_id: String,
    pub output: String,
    pub status: ToolResultStatus,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            status: ToolResultStatus::Success,
        }
    }

    pub fn failed(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            status: ToolResultStatus::Failed,
        }
    }

    /// Output payload submitted to the service. A failure is surfaced to the
    /// model as an error-tagged body; the wire item has no status field.
    pub(crate) fn wire_output(&self) -> String {
        match self.status {
            ToolResultStatus::Success => self.output.clone(),
            ToolResultStatus::Failed => json!({ "error": self.output }).to_string(),
        }
    }
}

/// Outstanding function calls awaiting a caller-supplied result.
///
/// Owned by the session worker; each invocation resolves at most once.
#[derive(Debug, Default)]
pub struct InvocationTable {
    outstanding: HashMap<String, ToolInvocation>,
}

impl InvocationTable {
    /// Record a freshly dispatched invocation. A repeated call id from the
    /// service replaces the stale entry.
    pub fn begin(&mut self, invocation: ToolInvocation) {
        self.outstanding
            .insert(invocation.call_id.clone(), invocation);
    }

    /// Take the invocation matching `call_id`, if it is outstanding.
    pub fn resolve(&mut self, call_id: &str) -> Option<ToolInvocation> {
        self.outstanding.remove(call_id)
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}
