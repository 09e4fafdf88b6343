//! Tool schema and dispatch for the tool-calling flow.

use cr_domain::chat::{CompletedToolCall, Message};
use cr_retrieval::WebSearchProvider;
use serde_json::Value;

/// OpenAI-format schema for the one tool chatrelay offers.
pub fn web_search_tool_schema() -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": "web_search",
            "description": "Search the web and return a compact markdown list of sources and snippets.",
            "parameters": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The search query" },
                    "max_results": {
                        "type": "integer",
                        "description": "How many results to return (1-10)",
                        "default": 5,
                        "minimum": 1,
                        "maximum": 10,
                    },
                    "engine": {
                        "type": "string",
                        "description": "Search engine: google or google_news",
                        "enum": ["google", "google_news"],
                        "default": "google",
                    },
                },
                "required": ["query"],
            },
        },
    })
}

/// Execute one completed tool call and produce the `tool` role message
/// the model expects back. Unknown tools and empty results both resolve
/// to text, never to a failed turn.
pub async fn dispatch(search: &WebSearchProvider, call: &CompletedToolCall) -> Message {
    if call.name != "web_search" {
        return Message::tool_result(&call.id, format!("Tool {} not implemented.", call.name));
    }

    let args = call.arguments_value();
    let (query, max_results, engine) = search_args(&args);

    tracing::debug!(call_id = %call.id, query = %query, "dispatching web_search tool");
    let summary = search.search(&query, max_results, engine.as_deref()).await;
    let content = if summary.is_empty() {
        "No results.".to_string()
    } else {
        summary
    };
    Message::tool_result(&call.id, content)
}

/// Pull the `web_search` parameters out of the call's argument object.
/// Everything the schema declares is honored; absent or mistyped fields
/// fall back to the provider's configured defaults.
fn search_args(args: &Value) -> (String, Option<usize>, Option<String>) {
    let query = args
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let max_results = args
        .get("max_results")
        .and_then(Value::as_u64)
        .map(|n| n as usize);
    let engine = args
        .get("engine")
        .and_then(Value::as_str)
        .map(str::to_string);
    (query, max_results, engine)
}
