//! SerpAPI-backed web search.

use cr_domain::config::SearchConfig;
use serde_json::Value;

const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

/// Fetches compact markdown summaries of web results.
///
/// Every failure path returns an empty string: a missing key, a blank
/// query, a transport error, a non-2xx status, or an empty result set.
/// The caller treats "" as "no web context this turn".
pub struct WebSearchProvider {
    api_key: Option<String>,
    engine: String,
    hl: String,
    gl: String,
    max_results: usize,
    client: reqwest::Client,
}

impl WebSearchProvider {
    pub fn from_config(cfg: &SearchConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::info!(env_var = %cfg.api_key_env, "search key not set, web search disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            engine: cfg.engine.clone(),
            hl: cfg.hl.clone(),
            gl: cfg.gl.clone(),
            max_results: cfg.max_results,
            client,
        }
    }

    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search with the configured defaults. `""` means no usable results.
    pub async fn summary(&self, query: &str) -> String {
        self.search(query, None, None).await
    }

    /// Search with per-call overrides; tool calls supply their own
    /// `max_results` and `engine`. `None` falls back to the configured
    /// default. `""` means no usable results.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        engine: Option<&str>,
    ) -> String {
        let key = match &self.api_key {
            Some(k) => k,
            None => return String::new(),
        };
        if query.trim().is_empty() {
            return String::new();
        }

        let (num, engine) = self.effective_params(max_results, engine);
        let resp = self
            .client
            .get(SERPAPI_ENDPOINT)
            .query(&[
                ("engine", engine.as_str()),
                ("q", query),
                ("api_key", key.as_str()),
                ("num", &num.to_string()),
                ("hl", self.hl.as_str()),
                ("gl", self.gl.as_str()),
            ])
            .send()
            .await;

        let data: Value = match resp {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "search response was not json");
                    return String::new();
                }
            },
            Ok(r) => {
                tracing::warn!(status = %r.status(), "search request rejected");
                return String::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "search request failed");
                return String::new();
            }
        };

        format_results(&data, num)
    }

    /// Resolve per-call overrides against the configured defaults. The
    /// result count is always clamped to what SerpAPI accepts.
    fn effective_params(&self, max_results: Option<usize>, engine: Option<&str>) -> (usize, String) {
        let num = max_results.unwrap_or(self.max_results).clamp(1, 10);
        let engine = match engine.map(str::trim) {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => self.engine.clone(),
        };
        (num, engine)
    }
}

/// Render SerpAPI results as markdown bullets, one per result:
/// `- [Title](URL) — snippet`. Snippets are flattened to one line and
/// cut at 240 characters; results without a URL are dropped.
fn format_results(data: &Value, max_results: usize) -> String {
    let results = data
        .get("organic_results")
        .and_then(|v| v.as_array())
        .filter(|a| !a.is_empty())
        .or_else(|| {
            data.get("news_results")
                .and_then(|v| v.as_array())
                .filter(|a| !a.is_empty())
        });
    let results = match results {
        Some(r) => r,
        None => return String::new(),
    };

    let mut bullets = Vec::new();
    for item in results.iter().take(max_results) {
        let str_field = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|k| item.get(*k).and_then(|v| v.as_str()))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let url = match str_field(&["link", "link_url"]) {
            Some(u) => u,
            None => continue,
        };
        let title = str_field(&["title"]).unwrap_or_else(|| url.clone());
        let snippet: String = str_field(&["snippet", "excerpt", "content"])
            .unwrap_or_default()
            .replace('\n', " ")
            .trim()
            .chars()
            .take(240)
            .collect();

        bullets.push(format!("- [{title}]({url}) — {snippet}"));
    }

    bullets.join("\n")
}
