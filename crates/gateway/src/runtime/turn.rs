//! Turn orchestration: persist the user message, assemble the envelope,
//! stream the completion, relay deltas, persist the assistant message.
//!
//! Split into two phases. [`prepare`] does everything that can fail with
//! a structured error (missing session, blank input, storage) before any
//! byte of the response body exists. [`spawn`] then drives the upstream
//! stream on its own task and feeds [`TurnEvent`]s through a channel; a
//! failure there simply drops the channel, which the caller relays as an
//! abrupt end of stream with no terminal event.

use futures_util::StreamExt;
use tokio::sync::mpsc;

use cr_domain::chat::{Message, Role};
use cr_domain::error::{Error, Result};
use cr_domain::mode::ChatMode;
use cr_domain::stream::StreamEvent;
use cr_providers::{ChatRequest, ToolCallAccumulator};

use super::{context, tools};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One caller request.
pub struct TurnInput {
    pub session_id: String,
    pub content: String,
    pub mode: ChatMode,
}

/// Events relayed to the HTTP layer during the streaming phase.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// One upstream content delta, relayed verbatim.
    Delta { text: String },
    /// The turn finished and the assistant message is persisted.
    Done,
}

/// Output of the synchronous phase: the outbound envelope, ready to
/// stream. The user message is already persisted by the time this exists.
pub struct PreparedTurn {
    session_id: String,
    mode: ChatMode,
    messages: Vec<Message>,
    offer_tools: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phase 1: prepare
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Validate, persist the user message, run best-effort augmentation, and
/// assemble the envelope.
///
/// The session check runs before any side effect or network call, so an
/// unknown session costs nothing and maps cleanly to 404. Augmentation
/// failures and empty provider results are skipped silently; they never
/// abort the turn.
pub async fn prepare(state: &AppState, input: TurnInput) -> Result<PreparedTurn> {
    let user_text = input.content.trim().to_string();
    if user_text.is_empty() {
        return Err(Error::InvalidInput("content must not be blank".into()));
    }
    if !state.store.session_exists(&input.session_id) {
        return Err(Error::NotFound(format!("session {}", input.session_id)));
    }

    state
        .store
        .append_message(&input.session_id, Role::User, &user_text)?;

    // Most recent N messages in chronological order. The user message
    // just persisted is the last entry.
    let mut history = state.store.list_messages(
        &input.session_id,
        state.config.context.history_limit,
        0,
        false,
    )?;
    history.reverse();

    let mut web_results = String::new();
    let mut doc_context = String::new();
    if input.mode.wants_web_search() {
        web_results = state.search.summary(&user_text).await;
        if web_results.is_empty() {
            tracing::debug!(session_id = %input.session_id, "web search returned nothing, skipping augmentation");
        }
    }
    if input.mode.wants_document_context() {
        doc_context = state.docs.context(&user_text).await;
        if doc_context.is_empty() {
            tracing::debug!(session_id = %input.session_id, "document index returned nothing, skipping augmentation");
        }
    }

    let messages = context::assemble(
        &state.config.context.system_prompt,
        &history,
        &web_results,
        &doc_context,
    );

    // Tool calling is a config policy; the gate keeps the tool off the
    // table for messages with no freshness signal.
    let offer_tools = state.config.tools.enabled && state.gate.should_search(&user_text);

    Ok(PreparedTurn {
        session_id: input.session_id,
        mode: input.mode,
        messages,
        offer_tools,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phase 2: stream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive the streaming phase on its own task.
///
/// On success the channel carries every delta followed by [`TurnEvent::Done`].
/// On upstream failure the channel closes without `Done` and no assistant
/// message is written.
pub fn spawn(state: AppState, turn: PreparedTurn) -> mpsc::Receiver<TurnEvent> {
    let (tx, rx) = mpsc::channel::<TurnEvent>(64);

    tokio::spawn(async move {
        let session_id = turn.session_id.clone();
        if let Err(e) = run_stream(&state, turn, &tx).await {
            tracing::warn!(session_id = %session_id, error = %e, "turn failed mid-stream");
        }
    });

    rx
}

async fn run_stream(
    state: &AppState,
    turn: PreparedTurn,
    tx: &mpsc::Sender<TurnEvent>,
) -> Result<()> {
    let mut messages = turn.messages;
    let mut offer_tools = turn.offer_tools;
    // Relayed deltas, in order, across all passes. This is exactly what
    // gets persisted at the end.
    let mut pieces = String::new();
    // Tool dispatches so far; each one re-enters the stream.
    let mut hops = 0usize;
    let max_hops = state.config.tools.max_hops;

    'passes: loop {
        let req = ChatRequest {
            messages: messages.clone(),
            model: None,
            enable_thinking: turn.mode.enable_thinking(),
            tools: if offer_tools {
                vec![tools::web_search_tool_schema()]
            } else {
                Vec::new()
            },
            tool_choice: offer_tools.then(|| "auto".to_string()),
        };

        let mut stream = state.upstream.chat_stream(&req).await?;
        let mut acc = ToolCallAccumulator::new();

        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::ContentDelta { text } => {
                    if tx.send(TurnEvent::Delta { text: text.clone() }).await.is_err() {
                        // Receiver dropped: the client disconnected. Stop
                        // reading so the upstream connection is released;
                        // nothing is persisted.
                        tracing::debug!("client disconnected, abandoning turn");
                        return Ok(());
                    }
                    pieces.push_str(&text);
                }
                StreamEvent::ToolCallFragment { fragment } => {
                    if let Some(call) = acc.add(&fragment) {
                        hops += 1;
                        if hops > max_hops {
                            // Budget spent: abandon the call and finalize
                            // with whatever text has accumulated.
                            tracing::warn!(
                                session_id = %turn.session_id,
                                tool = %call.name,
                                max_hops,
                                "tool-call hop limit reached, finalizing"
                            );
                            break 'passes;
                        }
                        tracing::debug!(hop = hops, tool = %call.name, "tool call completed, re-entering stream");
                        messages.push(Message::assistant_tool_calls(String::new(), &[call.clone()]));
                        messages.push(tools::dispatch(&state.search, &call).await);
                        // Resumed passes never re-offer the tool schema.
                        offer_tools = false;
                        continue 'passes;
                    }
                }
                StreamEvent::StreamEnd => break,
            }
        }

        break;
    }

    // Finalize: exactly one assistant message per completed turn, empty
    // text included.
    let final_text = pieces.trim().to_string();
    state
        .store
        .append_message(&turn.session_id, Role::Assistant, &final_text)?;
    let _ = tx.send(TurnEvent::Done).await;
    Ok(())
}
