//! Conversation persistence for chatrelay.
//!
//! Sessions live in a single `sessions.json` index under the configured
//! state path; each session's messages are an append-only
//! `<sessionId>.jsonl` file next to it. An in-memory write-through cache
//! keeps reads off disk after the first load.

pub mod records;
pub mod store;

pub use records::{MessageRecord, SessionRecord, DEFAULT_SESSION_NAME};
pub use store::ConversationStore;
