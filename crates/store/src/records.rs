use chrono::{DateTime, Utc};
use cr_domain::chat::Role;
use serde::{Deserialize, Serialize};

/// Name given to sessions created without one. Auto-titling only ever
/// replaces this value, never a name the user chose.
pub const DEFAULT_SESSION_NAME: &str = "New Chat";

/// Characters of the first user message used as the auto-title.
pub(crate) const TITLE_SNIPPET_LEN: usize = 10;

/// A single chat session tracked in `sessions.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One stored message, a single line in the session's JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
