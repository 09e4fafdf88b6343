//! JSON-index + JSONL-log conversation store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;

use cr_domain::chat::Role;
use cr_domain::error::{Error, Result};

use crate::records::{MessageRecord, SessionRecord, DEFAULT_SESSION_NAME, TITLE_SNIPPET_LEN};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conversation store backed by `sessions.json` plus per-session JSONL
/// message logs.
///
/// All writes go to disk first and update the cache only on success, so
/// the cache never claims state the disk does not have.
pub struct ConversationStore {
    dir: PathBuf,
    sessions_path: PathBuf,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    messages: RwLock<HashMap<String, Vec<MessageRecord>>>,
}

impl ConversationStore {
    /// Load or create the store at `state_path/conversations/`.
    pub fn new(state_path: &Path) -> Result<Self> {
        let dir = state_path.join("conversations");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let sessions_path = dir.join("sessions.json");
        let sessions: HashMap<String, SessionRecord> = if sessions_path.exists() {
            let raw = std::fs::read_to_string(&sessions_path).map_err(Error::Io)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::info!(
            sessions = sessions.len(),
            path = %sessions_path.display(),
            "conversation store loaded"
        );

        Ok(Self {
            dir,
            sessions_path,
            sessions: RwLock::new(sessions),
            messages: RwLock::new(HashMap::new()),
        })
    }

    // ── Sessions ───────────────────────────────────────────────────

    /// Create a session. `name` defaults to [`DEFAULT_SESSION_NAME`],
    /// which makes the session eligible for auto-titling.
    pub fn create_session(
        &self,
        user_id: Option<String>,
        name: Option<String>,
    ) -> Result<SessionRecord> {
        let record = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            created_at: Utc::now(),
        };

        {
            let mut sessions = self.sessions.write();
            sessions.insert(record.id.clone(), record.clone());
        }
        self.flush()?;

        tracing::debug!(session_id = %record.id, "session created");
        Ok(record)
    }

    /// Look up a session.
    pub fn get_session(&self, session_id: &str) -> Result<SessionRecord> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))
    }

    pub fn session_exists(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// List sessions, newest-first by default, optionally filtered to one
    /// user, with offset/limit paging.
    pub fn list_sessions(
        &self,
        user_id: Option<&str>,
        limit: usize,
        offset: usize,
        newest_first: bool,
    ) -> Vec<SessionRecord> {
        let mut out: Vec<SessionRecord> = self
            .sessions
            .read()
            .values()
            .filter(|s| match user_id {
                Some(uid) => s.user_id.as_deref() == Some(uid),
                None => true,
            })
            .cloned()
            .collect();

        out.sort_by(|a, b| {
            let ord = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
            if newest_first {
                ord.reverse()
            } else {
                ord
            }
        });

        out.into_iter().skip(offset).take(limit).collect()
    }

    /// Rename a session. This is the user picking a name, so the session
    /// leaves the auto-title pool.
    pub fn rename_session(&self, session_id: &str, name: &str) -> Result<SessionRecord> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("session name must not be blank".into()));
        }
        let record = {
            let mut sessions = self.sessions.write();
            let record = sessions
                .get_mut(session_id)
                .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
            record.name = name.trim().to_string();
            record.clone()
        };
        self.flush()?;
        Ok(record)
    }

    /// Delete a session and its message log.
    pub fn delete_session(&self, session_id: &str) -> Result<()> {
        let removed = self.sessions.write().remove(session_id);
        if removed.is_none() {
            return Err(Error::NotFound(format!("session {session_id}")));
        }
        self.messages.write().remove(session_id);

        let path = self.log_path(session_id);
        if path.exists() {
            std::fs::remove_file(&path).map_err(Error::Io)?;
        }
        self.flush()?;
        tracing::debug!(session_id = session_id, "session deleted");
        Ok(())
    }

    // ── Messages ───────────────────────────────────────────────────

    /// Append one message to a session's log.
    ///
    /// On the very first message of a still-default-named session, the
    /// session is auto-titled with a short snippet of the content.
    pub fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<MessageRecord> {
        if !self.session_exists(session_id) {
            return Err(Error::NotFound(format!("session {session_id}")));
        }

        let is_first = self.count_messages(session_id)? == 0;

        let record = MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };

        // Disk first, cache second.
        self.append_line(session_id, &record)?;
        self.messages
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(record.clone());

        if is_first {
            self.maybe_auto_title(session_id, content)?;
        }

        Ok(record)
    }

    /// Messages in insertion order, with offset/limit paging. Set
    /// `ascending = false` for newest-first.
    pub fn list_messages(
        &self,
        session_id: &str,
        limit: usize,
        offset: usize,
        ascending: bool,
    ) -> Result<Vec<MessageRecord>> {
        let mut out = self.load_messages(session_id)?;
        if !ascending {
            out.reverse();
        }
        Ok(out.into_iter().skip(offset).take(limit).collect())
    }

    pub fn count_messages(&self, session_id: &str) -> Result<usize> {
        Ok(self.load_messages(session_id)?.len())
    }

    /// Find one message by id, scanning session logs.
    pub fn get_message(&self, message_id: &str) -> Result<MessageRecord> {
        let session_ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        for sid in session_ids {
            if let Some(m) = self
                .load_messages(&sid)?
                .into_iter()
                .find(|m| m.id == message_id)
            {
                return Ok(m);
            }
        }
        Err(Error::NotFound(format!("message {message_id}")))
    }

    /// Replace a message's content, rewriting the session's log.
    pub fn update_message(&self, message_id: &str, content: &str) -> Result<MessageRecord> {
        let found = self.get_message(message_id)?;
        let mut messages = self.load_messages(&found.session_id)?;
        let updated = {
            let slot = messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;
            slot.content = content.to_string();
            slot.clone()
        };
        self.rewrite_log(&found.session_id, &messages)?;
        Ok(updated)
    }

    /// Delete one message, rewriting the session's log.
    pub fn delete_message(&self, message_id: &str) -> Result<()> {
        let found = self.get_message(message_id)?;
        let mut messages = self.load_messages(&found.session_id)?;
        messages.retain(|m| m.id != message_id);
        self.rewrite_log(&found.session_id, &messages)
    }

    /// Persist the session index.
    pub fn flush(&self) -> Result<()> {
        let sessions = self.sessions.read();
        let json = serde_json::to_string_pretty(&*sessions)?;
        std::fs::write(&self.sessions_path, json).map_err(Error::Io)?;
        Ok(())
    }

    // ── Private helpers ────────────────────────────────────────────

    fn log_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.jsonl"))
    }

    /// Auto-title: first message into a session whose name is still the
    /// default renames it to the leading characters of that message.
    fn maybe_auto_title(&self, session_id: &str, content: &str) -> Result<()> {
        let snippet: String = content.trim().chars().take(TITLE_SNIPPET_LEN).collect();
        if snippet.is_empty() {
            return Ok(());
        }
        let retitled = {
            let mut sessions = self.sessions.write();
            match sessions.get_mut(session_id) {
                Some(record) if record.name == DEFAULT_SESSION_NAME => {
                    record.name = snippet;
                    true
                }
                _ => false,
            }
        };
        if retitled {
            self.flush()?;
        }
        Ok(())
    }

    /// Cached view of a session's messages, loading the JSONL log on the
    /// first touch.
    fn load_messages(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        if !self.session_exists(session_id) {
            return Err(Error::NotFound(format!("session {session_id}")));
        }
        {
            let cache = self.messages.read();
            if let Some(msgs) = cache.get(session_id) {
                return Ok(msgs.clone());
            }
        }

        let msgs = self.read_log(session_id)?;
        self.messages
            .write()
            .insert(session_id.to_string(), msgs.clone());
        Ok(msgs)
    }

    fn append_line(&self, session_id: &str, record: &MessageRecord) -> Result<()> {
        use std::io::Write;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(session_id))
            .map_err(Error::Io)?;
        file.write_all(line.as_bytes()).map_err(Error::Io)?;
        Ok(())
    }

    fn rewrite_log(&self, session_id: &str, messages: &[MessageRecord]) -> Result<()> {
        let mut buf = String::new();
        for m in messages {
            buf.push_str(&serde_json::to_string(m)?);
            buf.push('\n');
        }
        std::fs::write(self.log_path(session_id), buf).map_err(Error::Io)?;
        self.messages
            .write()
            .insert(session_id.to_string(), messages.to_vec());
        Ok(())
    }

    fn read_log(&self, session_id: &str) -> Result<Vec<MessageRecord>> {
        let path = self.log_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        let mut out = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MessageRecord>(line) {
                Ok(m) => out.push(m),
                Err(e) => {
                    tracing::warn!(
                        session_id = session_id,
                        error = %e,
                        "skipping malformed message line"
                    );
                }
            }
        }
        Ok(out)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
