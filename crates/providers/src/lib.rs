//! Upstream completion client for chatrelay.
//!
//! Decodes the OpenAI-compatible chunked streaming protocol into
//! [`cr_domain::StreamEvent`]s and reconstructs tool calls from streamed
//! fragments.

pub mod openai;
pub mod toolcall;
pub mod traits;
pub(crate) mod sse;
pub(crate) mod util;

// Re-exports for convenience.
pub use openai::OpenAiUpstream;
pub use toolcall::ToolCallAccumulator;
pub use traits::{ChatRequest, EmbeddingsRequest, EmbeddingsResponse, UpstreamClient};
