use serde::{Deserialize, Serialize};

/// A message in the outbound completion envelope.
///
/// Serializes directly to the OpenAI-compatible wire shape: optional
/// `tool_calls` on assistant messages, optional `tool_call_id` on tool
/// messages, both omitted everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool" => Ok(Role::Tool),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// One entry of an assistant message's `tool_calls` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub name: String,
    /// JSON-encoded arguments, kept as the raw string the model produced.
    pub arguments: String,
}

/// A fully reconstructed tool invocation, produced by the accumulator once
/// the name is non-empty and the arguments string parses as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedToolCall {
    pub id: String,
    pub name: String,
    /// Raw accumulated arguments string (valid JSON by construction).
    pub arguments: String,
}

impl CompletedToolCall {
    /// Parse the accumulated arguments. Falls back to an empty object if
    /// the string somehow fails to parse (completion guarantees it does).
    pub fn arguments_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.arguments)
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// The wire payload recording this call on an assistant message.
    pub fn to_payload(&self) -> ToolCallPayload {
        ToolCallPayload {
            id: self.id.clone(),
            kind: "function".into(),
            function: FunctionPayload {
                name: self.name.clone(),
                arguments: self.arguments.clone(),
            },
        }
    }
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Assistant message recording one or more tool invocations.
    pub fn assistant_tool_calls(text: impl Into<String>, calls: &[CompletedToolCall]) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls: Some(calls.iter().map(CompletedToolCall::to_payload).collect()),
            tool_call_id: None,
        }
    }

    /// Tool-role message carrying a tool's result back to the model.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_omits_tool_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn tool_result_carries_call_id() {
        let json = serde_json::to_value(Message::tool_result("call_1", "ok")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "role": "tool",
                "content": "ok",
                "tool_call_id": "call_1",
            })
        );
    }

    #[test]
    fn assistant_tool_call_wire_shape() {
        let call = CompletedToolCall {
            id: "call_1".into(),
            name: "web_search".into(),
            arguments: r#"{"query":"rust"}"#.into(),
        };
        let json = serde_json::to_value(Message::assistant_tool_calls("", &[call])).unwrap();
        assert_eq!(
            json["tool_calls"][0],
            serde_json::json!({
                "id": "call_1",
                "type": "function",
                "function": {"name": "web_search", "arguments": "{\"query\":\"rust\"}"},
            })
        );
    }
}
