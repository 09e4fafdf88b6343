use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_8080")]
    pub port: u16,
    /// CORS allow-list. `["*"]` allows any origin.
    #[serde(default = "d_cors")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 8080,
            cors_origins: d_cors(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding `sessions.json` and per-session message logs.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Upstream completion service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible endpoint (no trailing slash).
    #[serde(default = "d_upstream_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the bearer token, if the endpoint
    /// requires one (local vLLM typically does not).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "d_embedding_model")]
    pub embedding_model: String,
    /// Connect timeout only. The streaming body has no overall deadline:
    /// generation may legitimately be slow.
    #[serde(default = "d_10")]
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: d_upstream_url(),
            model: d_model(),
            api_key_env: None,
            embedding_model: d_embedding_model(),
            connect_timeout_secs: 10,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prompt context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Most recent N stored messages included in the envelope.
    #[serde(default = "d_100")]
    pub history_limit: usize,
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            system_prompt: d_system_prompt(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Web search
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Environment variable holding the SerpAPI key. Search is silently
    /// disabled when the variable is unset.
    #[serde(default = "d_serpapi_env")]
    pub api_key_env: String,
    #[serde(default = "d_5")]
    pub max_results: usize,
    #[serde(default = "d_engine")]
    pub engine: String,
    #[serde(default = "d_hl")]
    pub hl: String,
    #[serde(default = "d_gl")]
    pub gl: String,
    #[serde(default = "d_12")]
    pub timeout_secs: u64,
    /// Freshness keywords consulted by the search gate.
    #[serde(default = "d_keywords")]
    pub keywords: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key_env: d_serpapi_env(),
            max_results: 5,
            engine: d_engine(),
            hl: d_hl(),
            gl: d_gl(),
            timeout_secs: 12,
            keywords: d_keywords(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Document index
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Source text file for the document index.
    #[serde(default = "d_docs_path")]
    pub path: PathBuf,
    #[serde(default = "d_800")]
    pub chunk_size: usize,
    #[serde(default = "d_200")]
    pub chunk_overlap: usize,
    #[serde(default = "d_3")]
    pub top_k: usize,
    #[serde(default = "d_400")]
    pub max_words: usize,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            path: d_docs_path(),
            chunk_size: 800,
            chunk_overlap: 200,
            top_k: 3,
            max_words: 400,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool calling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Offer the web_search tool on the first streaming pass of a turn.
    #[serde(default)]
    pub enabled: bool,
    /// Tool-call re-entries allowed per turn. Exceeding the budget
    /// abandons the pending call and finalizes the turn with whatever
    /// text has accumulated.
    #[serde(default = "d_3")]
    pub max_hops: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_hops: 3,
        }
    }
}

// ── Default helpers ────────────────────────────────────────────────

fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_8080() -> u16 {
    8080
}
fn d_cors() -> Vec<String> {
    vec!["*".into()]
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_upstream_url() -> String {
    "http://localhost:8000/v1".into()
}
fn d_model() -> String {
    "Qwen/Qwen3-0.6B".into()
}
fn d_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn d_system_prompt() -> String {
    "You are a helpful assistant. Do not reveal hidden reasoning. \
     If web results are provided below, prefer them for facts and cite \
     links in markdown."
        .into()
}
fn d_serpapi_env() -> String {
    "SERPAPI_API_KEY".into()
}
fn d_engine() -> String {
    "google".into()
}
fn d_hl() -> String {
    "zh-TW".into()
}
fn d_gl() -> String {
    "tw".into()
}
fn d_keywords() -> Vec<String> {
    [
        "latest", "today", "news", "update", "recent", "price", "release",
        "breaking", "現在", "最新", "新聞", "價格", "更新", "近況",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn d_docs_path() -> PathBuf {
    PathBuf::from("./docs/test.txt")
}
fn d_3() -> usize {
    3
}
fn d_5() -> usize {
    5
}
fn d_10() -> u64 {
    10
}
fn d_12() -> u64 {
    12
}
fn d_100() -> usize {
    100
}
fn d_200() -> usize {
    200
}
fn d_400() -> usize {
    400
}
fn d_800() -> usize {
    800
}
