//! AppState construction extracted from `main.rs`.

use std::sync::Arc;

use anyhow::Context;

use cr_domain::config::Config;
use cr_providers::{OpenAiUpstream, UpstreamClient};
use cr_retrieval::{DocumentIndex, SearchGate, WebSearchProvider};
use cr_store::ConversationStore;

use crate::state::AppState;

/// Initialize every subsystem and return a fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let store = Arc::new(
        ConversationStore::new(&config.store.state_path).context("opening conversation store")?,
    );

    let upstream: Arc<dyn UpstreamClient> = Arc::new(
        OpenAiUpstream::from_config(&config.upstream).context("building upstream client")?,
    );
    tracing::info!(base_url = %config.upstream.base_url, model = %config.upstream.model, "upstream client ready");

    let search = Arc::new(WebSearchProvider::from_config(&config.search));
    let gate = Arc::new(SearchGate::from_config(&config.search));
    let docs = Arc::new(DocumentIndex::new(&config.docs, Arc::clone(&upstream)));

    Ok(AppState {
        config,
        store,
        upstream,
        search,
        gate,
        docs,
    })
}
