use std::sync::Arc;

use cr_domain::config::Config;
use cr_providers::UpstreamClient;
use cr_retrieval::{DocumentIndex, SearchGate, WebSearchProvider};
use cr_store::ConversationStore;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Durable sessions and message logs.
    pub store: Arc<ConversationStore>,
    /// The OpenAI-compatible completion client (swapped for a scripted
    /// fake in tests).
    pub upstream: Arc<dyn UpstreamClient>,
    pub search: Arc<WebSearchProvider>,
    pub gate: Arc<SearchGate>,
    pub docs: Arc<DocumentIndex>,
}
