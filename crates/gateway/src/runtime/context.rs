//! Prompt envelope assembly.

use cr_domain::chat::Message;
use cr_store::MessageRecord;

/// Build the outbound message list for one turn.
///
/// Order matters to the model: the fixed system instruction first, the
/// stored history in chronological order (the just-persisted user message
/// is its last entry), then at most one web-results system message and at
/// most one document-context system message. Augmentations are appended
/// only when the caller passes non-empty provider output; the assembler
/// itself calls no providers and enforces no exclusivity between them.
pub fn assemble(
    system_prompt: &str,
    history: &[MessageRecord],
    web_results: &str,
    doc_context: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 3);
    messages.push(Message::system(system_prompt));

    for record in history {
        messages.push(Message {
            role: record.role,
            content: record.content.clone(),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    if !web_results.is_empty() {
        messages.push(Message::system(format!(
            "Web results (use if relevant; cite the links you rely on):\n\n{web_results}"
        )));
    }
    if !doc_context.is_empty() {
        messages.push(Message::system(format!(
            "Document context (use if relevant):\n\n{doc_context}"
        )));
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cr_domain::chat::Role;

    fn record(role: Role, content: &str) -> MessageRecord {
        MessageRecord {
            id: "m".into(),
            session_id: "s".into(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn first_turn_is_system_then_user() {
        let history = vec![record(Role::User, "Hello")];
        let messages = assemble("be helpful", &history, "", "");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "be helpful");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Hello");
    }

    #[test]
    fn history_keeps_chronological_order() {
        let history = vec![
            record(Role::User, "a"),
            record(Role::Assistant, "b"),
            record(Role::User, "c"),
        ];
        let messages = assemble("sys", &history, "", "");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["sys", "a", "b", "c"]);
    }

    #[test]
    fn web_results_append_one_system_message_after_history() {
        let history = vec![record(Role::User, "latest news?")];
        let messages = assemble("sys", &history, "- [t](u) — s", "");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, Role::System);
        assert!(messages[2].content.starts_with("Web results"));
        assert!(messages[2].content.ends_with("- [t](u) — s"));
    }

    #[test]
    fn empty_augmentation_leaves_envelope_identical_to_plain() {
        let history = vec![record(Role::User, "question")];
        let plain = assemble("sys", &history, "", "");
        let doc_mode_empty = assemble("sys", &history, "", "");
        assert_eq!(plain, doc_mode_empty);
        assert_eq!(plain.len(), 2);
    }

    #[test]
    fn both_augmentations_can_coexist() {
        let history = vec![record(Role::User, "q")];
        let messages = assemble("sys", &history, "web", "doc");
        assert_eq!(messages.len(), 4);
        assert!(messages[2].content.contains("web"));
        assert!(messages[3].content.contains("doc"));
    }
}
