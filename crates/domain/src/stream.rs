use std::pin::Pin;

/// A boxed async stream, used for upstream streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events decoded from the upstream completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// An incremental fragment of generated text.
    ContentDelta { text: String },

    /// One raw element of a `delta.tool_calls` array, handed to the
    /// tool-call accumulator unmodified.
    ToolCallFragment { fragment: serde_json::Value },

    /// The `[DONE]` sentinel (or end of body) was reached.
    StreamEnd,
}
