use cr_domain::chat::Message;
use cr_domain::error::Result;
use cr_domain::stream::{BoxStream, StreamEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The outbound completion envelope.
///
/// Invariant: `messages` always begins with exactly one system message
/// (the context assembler guarantees this).
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Ordered message list to send.
    pub messages: Vec<Message>,
    /// Model identifier override. When `None`, the client uses its default.
    pub model: Option<String>,
    /// Extended-reasoning toggle, forwarded as
    /// `chat_template_kwargs.enable_thinking`.
    pub enable_thinking: bool,
    /// Tool schemas in OpenAI function format. Empty = omit.
    pub tools: Vec<serde_json::Value>,
    /// Tool-choice policy (`"auto"` when tools are offered).
    pub tool_choice: Option<String>,
}

/// A request for text embeddings.
#[derive(Debug, Clone)]
pub struct EmbeddingsRequest {
    /// Input texts to embed.
    pub input: Vec<String>,
    /// Model to use. When `None`, the client uses its default embedding model.
    pub model: Option<String>,
}

/// An embeddings response.
#[derive(Debug, Clone)]
pub struct EmbeddingsResponse {
    /// One embedding vector per input text.
    pub embeddings: Vec<Vec<f32>>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core client trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait the turn orchestrator drives.
///
/// The production implementation is [`crate::OpenAiUpstream`]; tests swap
/// in scripted fakes to exercise the orchestrator without a network.
#[async_trait::async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Open one chunked connection and return a lazy, finite,
    /// non-restartable sequence of decoded stream events.
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// Generate text embeddings.
    async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse>;

    /// A unique identifier for this client instance.
    fn id(&self) -> &str;
}
