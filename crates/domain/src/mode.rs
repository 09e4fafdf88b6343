use serde::Deserialize;

/// How a turn should be executed, selected by the caller as a small
/// integer in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum ChatMode {
    /// Plain completion, no augmentation, thinking disabled.
    Plain,
    /// Extended-reasoning toggle enabled on the upstream request.
    Reasoning,
    /// Prompt augmented with web-search results before the upstream call.
    WebSearch,
    /// Prompt augmented with locally indexed document context.
    DocumentContext,
}

impl TryFrom<u8> for ChatMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChatMode::Plain),
            1 => Ok(ChatMode::Reasoning),
            2 => Ok(ChatMode::WebSearch),
            3 => Ok(ChatMode::DocumentContext),
            other => Err(format!("unknown chat mode: {other}")),
        }
    }
}

impl ChatMode {
    /// Whether the upstream request should enable the reasoning toggle.
    pub fn enable_thinking(self) -> bool {
        matches!(self, ChatMode::Reasoning)
    }

    pub fn wants_web_search(self) -> bool {
        matches!(self, ChatMode::WebSearch)
    }

    pub fn wants_document_context(self) -> bool {
        matches!(self, ChatMode::DocumentContext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_integer() {
        let mode: ChatMode = serde_json::from_str("2").unwrap();
        assert_eq!(mode, ChatMode::WebSearch);
    }

    #[test]
    fn rejects_unknown_integer() {
        assert!(serde_json::from_str::<ChatMode>("7").is_err());
    }
}
