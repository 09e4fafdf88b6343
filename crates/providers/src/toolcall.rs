//! Incremental tool-call reassembly.
//!
//! OpenAI-compatible upstreams stream tool calls as deltas: the first
//! fragment carries the call id and (usually) the function name, later
//! fragments append pieces of the JSON argument string. The accumulator
//! buffers fragments per call id and surfaces a call exactly once, as
//! soon as its name is known and its arguments parse as JSON.

use cr_domain::chat::CompletedToolCall;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct PendingCall {
    name: String,
    arguments: String,
}

impl PendingCall {
    /// Complete when the name is known and the argument buffer holds a
    /// full JSON document. A prefix of a JSON document never parses, so
    /// this cannot fire early on a fragmented argument string.
    fn is_complete(&self) -> bool {
        !self.name.is_empty()
            && !self.arguments.trim().is_empty()
            && serde_json::from_str::<Value>(&self.arguments).is_ok()
    }
}

/// Reassembles streamed tool-call fragments into completed calls.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: HashMap<String, PendingCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw fragment from the upstream delta.
    ///
    /// Returns the completed call the moment its arguments first parse;
    /// the call is then dropped from the buffer so it is never emitted
    /// twice. Fragments without an id are discarded (vLLM repeats the id
    /// on every fragment).
    pub fn add(&mut self, fragment: &Value) -> Option<CompletedToolCall> {
        let id = match fragment.get("id").and_then(|v| v.as_str()) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return None,
        };

        let entry = self.pending.entry(id.clone()).or_default();

        if let Some(function) = fragment.get("function") {
            if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
                entry.name.push_str(name);
            }
            if let Some(args) = function.get("arguments").and_then(|v| v.as_str()) {
                entry.arguments.push_str(args);
            }
        }

        if entry.is_complete() {
            let call = self.pending.remove(&id)?;
            return Some(CompletedToolCall {
                id,
                name: call.name,
                arguments: call.arguments,
            });
        }
        None
    }
}
