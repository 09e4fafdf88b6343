//! End-to-end tests for the streaming turn endpoint, driven through the
//! real router with a scripted upstream in place of the network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use tower::ServiceExt;

use cr_domain::chat::Role;
use cr_domain::config::Config;
use cr_domain::error::{Error, Result};
use cr_domain::stream::{BoxStream, StreamEvent};
use cr_gateway::api;
use cr_gateway::state::AppState;
use cr_providers::{ChatRequest, EmbeddingsRequest, EmbeddingsResponse, UpstreamClient};
use cr_retrieval::{DocumentIndex, SearchGate, WebSearchProvider};
use cr_store::ConversationStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted upstream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Plays back one pre-scripted event sequence per `chat_stream` call and
/// records every request it receives.
struct ScriptedUpstream {
    scripts: Mutex<VecDeque<Vec<Result<StreamEvent>>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedUpstream {
    fn new(scripts: Vec<Vec<Result<StreamEvent>>>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn recorded(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl UpstreamClient for ScriptedUpstream {
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        self.requests.lock().unwrap().push(req.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Other("no script left".into()))?;
        Ok(futures_util::stream::iter(script).boxed())
    }

    async fn embeddings(&self, _req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        Err(Error::Other("no embeddings in this test".into()))
    }

    fn id(&self) -> &str {
        "scripted"
    }
}

fn delta(text: &str) -> Result<StreamEvent> {
    Ok(StreamEvent::ContentDelta { text: text.into() })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Harness {
    app: Router,
    store: Arc<ConversationStore>,
    upstream: Arc<ScriptedUpstream>,
    _dir: tempfile::TempDir,
}

fn harness_with(mut config: Config, upstream: Arc<ScriptedUpstream>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    config.store.state_path = dir.path().to_path_buf();
    // Neither retrieval source may touch the outside world.
    config.search.api_key_env = "CHATRELAY_TEST_UNSET".into();
    config.docs.path = dir.path().join("absent.txt");

    let store = Arc::new(ConversationStore::new(&config.store.state_path).unwrap());
    let config = Arc::new(config);
    let upstream_dyn: Arc<dyn UpstreamClient> = upstream.clone();

    let state = AppState {
        store: Arc::clone(&store),
        upstream: Arc::clone(&upstream_dyn),
        search: Arc::new(WebSearchProvider::from_config(&config.search)),
        gate: Arc::new(SearchGate::from_config(&config.search)),
        docs: Arc::new(DocumentIndex::new(&config.docs, upstream_dyn)),
        config,
    };

    Harness {
        app: api::router().with_state(state),
        store,
        upstream,
        _dir: dir,
    }
}

fn harness(scripts: Vec<Vec<Result<StreamEvent>>>) -> Harness {
    harness_with(Config::default(), ScriptedUpstream::new(scripts))
}

async fn post_stream(
    app: Router,
    session_id: &str,
    body: serde_json::Value,
) -> (StatusCode, Option<String>, Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/chat/{session_id}/stream"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, bytes)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn happy_path_relays_every_delta_and_persists_both_messages() {
    let h = harness(vec![vec![
        delta("Hi"),
        delta(" there"),
        Ok(StreamEvent::StreamEnd),
    ]]);
    let session = h.store.create_session(None, None).unwrap();

    let (status, content_type, body) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "Hello", "mode": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/event-stream"));
    assert_eq!(
        &body[..],
        b"data:Hi\n\ndata: there\n\nevent:done\ndata:ok\n\n"
    );

    let messages = h.store.list_messages(&session.id, 100, 0, true).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there");
}

#[tokio::test]
async fn upstream_failure_ends_stream_without_done_and_persists_nothing_extra() {
    let h = harness(vec![vec![
        delta("Hi"),
        Err(Error::Http("connection reset".into())),
    ]]);
    let session = h.store.create_session(None, None).unwrap();

    let (status, _, body) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "Hello", "mode": 0 }),
    )
    .await;

    // The status was already committed when the failure happened.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"data:Hi\n\n");

    let messages = h.store.list_messages(&session.id, 100, 0, true).unwrap();
    assert_eq!(messages.len(), 1, "only the user message may exist");
    assert_eq!(messages[0].role, Role::User);
}

#[tokio::test]
async fn unknown_session_is_404_before_any_upstream_call() {
    let h = harness(vec![]);
    let (status, _, _) = post_stream(
        h.app.clone(),
        "no-such-session",
        serde_json::json!({ "content": "Hello", "mode": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.upstream.recorded().is_empty());
}

#[tokio::test]
async fn blank_content_is_400_with_no_side_effects() {
    let h = harness(vec![]);
    let session = h.store.create_session(None, None).unwrap();

    let (status, _, _) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "   ", "mode": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.store.count_messages(&session.id).unwrap(), 0);
    // Blank input must not auto-title either.
    assert_eq!(h.store.get_session(&session.id).unwrap().name, "New Chat");
}

#[tokio::test]
async fn unknown_mode_integer_is_rejected() {
    let h = harness(vec![]);
    let session = h.store.create_session(None, None).unwrap();

    let (status, _, _) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "Hello", "mode": 9 }),
    )
    .await;

    assert!(status.is_client_error());
    assert_eq!(h.store.count_messages(&session.id).unwrap(), 0);
}

#[tokio::test]
async fn reasoning_mode_sets_the_thinking_flag_only() {
    let h = harness(vec![vec![delta("ok"), Ok(StreamEvent::StreamEnd)]]);
    let session = h.store.create_session(None, None).unwrap();

    post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "Why?", "mode": 1 }),
    )
    .await;

    let requests = h.upstream.recorded();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].enable_thinking);
    assert!(requests[0].tools.is_empty());
}

#[tokio::test]
async fn empty_document_context_leaves_envelope_identical_to_plain() {
    // Two identical turns in separate sessions, doc mode vs plain. The
    // document file is absent, so augmentation must add nothing.
    let h = harness(vec![
        vec![delta("a"), Ok(StreamEvent::StreamEnd)],
        vec![delta("b"), Ok(StreamEvent::StreamEnd)],
    ]);
    let s1 = h.store.create_session(None, None).unwrap();
    let s2 = h.store.create_session(None, None).unwrap();

    post_stream(
        h.app.clone(),
        &s1.id,
        serde_json::json!({ "content": "question", "mode": 3 }),
    )
    .await;
    post_stream(
        h.app.clone(),
        &s2.id,
        serde_json::json!({ "content": "question", "mode": 0 }),
    )
    .await;

    let requests = h.upstream.recorded();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages, requests[1].messages);
    assert!(!requests[0].enable_thinking);
}

#[tokio::test]
async fn envelope_starts_with_system_and_ends_with_user() {
    let h = harness(vec![vec![delta("ok"), Ok(StreamEvent::StreamEnd)]]);
    let session = h.store.create_session(None, None).unwrap();
    h.store
        .append_message(&session.id, Role::User, "earlier question")
        .unwrap();
    h.store
        .append_message(&session.id, Role::Assistant, "earlier answer")
        .unwrap();

    post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "follow-up", "mode": 0 }),
    )
    .await;

    let requests = h.upstream.recorded();
    let messages = &requests[0].messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].content, "earlier question");
    assert_eq!(messages[2].content, "earlier answer");
    assert_eq!(messages[3].role, Role::User);
    assert_eq!(messages[3].content, "follow-up");
}

#[tokio::test]
async fn tool_call_pass_re_enters_stream_without_tools() {
    let mut config = Config::default();
    config.tools.enabled = true;

    // Pass 1: the model emits a fragmented web_search call. Pass 2: the
    // final answer.
    let fragment1 = serde_json::json!({
        "id": "call_1",
        "function": { "name": "web_search", "arguments": "{\"query\":" }
    });
    let fragment2 = serde_json::json!({
        "id": "call_1",
        "function": { "arguments": "\"taipei weather\",\"max_results\":2,\"engine\":\"google_news\"}" }
    });
    let upstream = ScriptedUpstream::new(vec![
        vec![
            Ok(StreamEvent::ToolCallFragment { fragment: fragment1 }),
            Ok(StreamEvent::ToolCallFragment { fragment: fragment2 }),
        ],
        vec![delta("It is sunny."), Ok(StreamEvent::StreamEnd)],
    ]);
    let h = harness_with(config, upstream);
    let session = h.store.create_session(None, None).unwrap();

    // "latest" passes the freshness gate, so the tool is offered.
    let (_, _, body) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "latest taipei weather", "mode": 0 }),
    )
    .await;

    assert_eq!(&body[..], b"data:It is sunny.\n\nevent:done\ndata:ok\n\n");

    let requests = h.upstream.recorded();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tool_choice.as_deref(), Some("auto"));
    // The resumed pass drops the schema and carries the tool exchange.
    assert!(requests[1].tools.is_empty());
    assert!(requests[1].tool_choice.is_none());
    let tail = &requests[1].messages[requests[1].messages.len() - 2..];
    assert_eq!(tail[0].role, Role::Assistant);
    assert_eq!(
        tail[0].tool_calls.as_ref().unwrap()[0].function.arguments,
        "{\"query\":\"taipei weather\",\"max_results\":2,\"engine\":\"google_news\"}"
    );
    assert_eq!(tail[1].role, Role::Tool);
    assert_eq!(tail[1].tool_call_id.as_deref(), Some("call_1"));
    // Search is unconfigured in tests, so the tool result degrades.
    assert_eq!(tail[1].content, "No results.");

    let messages = h.store.list_messages(&session.id, 100, 0, true).unwrap();
    assert_eq!(messages.last().unwrap().content, "It is sunny.");
}

#[tokio::test]
async fn hop_limit_exhaustion_finalizes_with_accumulated_text() {
    let mut config = Config::default();
    config.tools.enabled = true;
    config.tools.max_hops = 2;

    // The model asks for a tool on every pass and never produces a final
    // answer. After two dispatches the budget is spent; the third call is
    // abandoned and the turn finalizes with the relayed text.
    let tool_pass = |id: &str| {
        vec![
            delta("Checking "),
            Ok(StreamEvent::ToolCallFragment {
                fragment: serde_json::json!({
                    "id": id,
                    "function": { "name": "web_search", "arguments": "{\"query\":\"x\"}" }
                }),
            }),
        ]
    };
    let upstream =
        ScriptedUpstream::new(vec![tool_pass("call_a"), tool_pass("call_b"), tool_pass("call_c")]);
    let h = harness_with(config, upstream);
    let session = h.store.create_session(None, None).unwrap();

    let (status, _, body) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "latest news please", "mode": 0 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        &body[..],
        b"data:Checking \n\ndata:Checking \n\ndata:Checking \n\nevent:done\ndata:ok\n\n"
    );

    // Two re-entries happened, the third completed call was dropped.
    assert_eq!(h.upstream.recorded().len(), 3);

    let messages = h.store.list_messages(&session.id, 100, 0, true).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Checking Checking Checking");
}

#[tokio::test]
async fn empty_completion_still_persists_an_assistant_message() {
    let h = harness(vec![vec![Ok(StreamEvent::StreamEnd)]]);
    let session = h.store.create_session(None, None).unwrap();

    let (_, _, body) = post_stream(
        h.app.clone(),
        &session.id,
        serde_json::json!({ "content": "Hello", "mode": 0 }),
    )
    .await;

    assert_eq!(&body[..], b"event:done\ndata:ok\n\n");
    let messages = h.store.list_messages(&session.id, 100, 0, true).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "");
}
