//! Shared types for chatrelay: error taxonomy, the wire message model,
//! chat modes, upstream stream events, and configuration.

pub mod chat;
pub mod config;
pub mod error;
pub mod mode;
pub mod stream;

pub use chat::{CompletedToolCall, FunctionPayload, Message, Role, ToolCallPayload};
pub use error::{Error, Result};
pub use mode::ChatMode;
pub use stream::{BoxStream, StreamEvent};
