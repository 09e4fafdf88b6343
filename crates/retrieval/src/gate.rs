//! Freshness gate for web search.

use cr_domain::config::SearchConfig;

/// Decides whether a user message warrants a web search.
///
/// A plain case-insensitive substring match against a keyword list.
/// Deliberately dumb: false positives cost one search, false negatives
/// cost nothing the model can't say on its own.
pub struct SearchGate {
    keywords: Vec<String>,
}

impl SearchGate {
    pub fn from_config(cfg: &SearchConfig) -> Self {
        Self {
            keywords: cfg.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn should_search(&self, user_text: &str) -> bool {
        let t = user_text.to_lowercase();
        self.keywords.iter().any(|k| t.contains(k.as_str()))
    }
}
