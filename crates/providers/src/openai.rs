//! OpenAI-compatible upstream adapter.
//!
//! Works with vLLM, Ollama, LM Studio, OpenAI itself, and any other
//! endpoint that follows the chat completions contract. Streaming only:
//! the orchestrator never issues non-streaming completion calls.

use crate::traits::{ChatRequest, EmbeddingsRequest, EmbeddingsResponse, UpstreamClient};
use crate::util::from_reqwest;
use cr_domain::config::UpstreamConfig;
use cr_domain::error::{Error, Result};
use cr_domain::stream::{BoxStream, StreamEvent};
use serde_json::Value;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Client for one OpenAI-compatible completion endpoint.
pub struct OpenAiUpstream {
    base_url: String,
    default_model: String,
    embedding_model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiUpstream {
    /// Create a client from the deserialized upstream config.
    ///
    /// Only a connect timeout is set: the streaming body has no overall
    /// deadline, since generation may legitimately be slow.
    pub fn from_config(cfg: &UpstreamConfig) -> Result<Self> {
        let api_key = match &cfg.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => {
                    tracing::warn!(env_var = %var, "upstream api_key_env not set, sending unauthenticated requests");
                    None
                }
            },
            None => None,
        };

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(cfg.connect_timeout_secs))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            default_model: cfg.model.clone(),
            embedding_model: cfg.embedding_model.clone(),
            api_key,
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    fn build_chat_body(&self, req: &ChatRequest) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut body = serde_json::json!({
            "model": model,
            "messages": req.messages,
            "stream": true,
            "chat_template_kwargs": { "enable_thinking": req.enable_thinking },
        });

        if !req.tools.is_empty() {
            body["tools"] = Value::Array(req.tools.clone());
        }
        if let Some(choice) = &req.tool_choice {
            body["tool_choice"] = Value::String(choice.clone());
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SSE payload parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse one `data:` payload into stream events.
///
/// The `[DONE]` sentinel short-circuits to [`StreamEvent::StreamEnd`]
/// without being parsed as data. Malformed JSON is a hard error: the
/// shared SSE loop ends the stream after yielding it.
fn parse_sse_data(data: &str) -> Vec<Result<StreamEvent>> {
    if data.trim() == "[DONE]" {
        return vec![Ok(StreamEvent::StreamEnd)];
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::Json(e))],
    };

    let delta = match v
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("delta"))
    {
        Some(d) => d,
        // Choiceless chunks (e.g. usage-only frames) carry nothing we relay.
        None => return Vec::new(),
    };

    let mut events = Vec::new();

    if let Some(tc_arr) = delta.get("tool_calls").and_then(|v| v.as_array()) {
        for fragment in tc_arr {
            events.push(Ok(StreamEvent::ToolCallFragment {
                fragment: fragment.clone(),
            }));
        }
    }

    if let Some(text) = delta.get("content").and_then(|v| v.as_str()) {
        if !text.is_empty() {
            events.push(Ok(StreamEvent::ContentDelta {
                text: text.to_string(),
            }));
        }
    }

    events
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl UpstreamClient for OpenAiUpstream {
    async fn chat_stream(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(req);

        tracing::debug!(url = %url, messages = req.messages.len(), "upstream stream request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let err_text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: err_text,
            });
        }

        Ok(crate::sse::sse_response_stream(resp, parse_sse_data))
    }

    async fn embeddings(&self, req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let model = req.model.unwrap_or_else(|| self.embedding_model.clone());
        let url = format!("{}/embeddings", self.base_url);
        let body = serde_json::json!({ "model": model, "input": req.input });

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                message: resp_text,
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let data = resp_json
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| Error::Other("missing 'data' array in embeddings response".into()))?;

        let embeddings: Vec<Vec<f32>> = data
            .iter()
            .filter_map(|item| {
                let embedding = item.get("embedding")?.as_array()?;
                Some(
                    embedding
                        .iter()
                        .filter_map(|v| v.as_f64().map(|f| f as f32))
                        .collect(),
                )
            })
            .collect();

        Ok(EmbeddingsResponse { embeddings })
    }

    fn id(&self) -> &str {
        &self.base_url
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use cr_domain::chat::Message;

    #[test]
    fn parse_content_delta() {
        let events =
            parse_sse_data(r#"{"choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#);
        assert_eq!(events.len(), 1);
        assert_eq!(
            *events[0].as_ref().unwrap(),
            StreamEvent::ContentDelta { text: "Hi".into() }
        );
    }

    #[test]
    fn parse_done_sentinel() {
        let events = parse_sse_data("[DONE]");
        assert_eq!(events.len(), 1);
        assert_eq!(*events[0].as_ref().unwrap(), StreamEvent::StreamEnd);
    }

    #[test]
    fn parse_malformed_payload_is_error() {
        let events = parse_sse_data("{not json");
        assert_eq!(events.len(), 1);
        assert!(events[0].is_err());
    }

    #[test]
    fn parse_empty_content_ignored() {
        let events = parse_sse_data(r#"{"choices":[{"delta":{"content":""}}]}"#);
        assert!(events.is_empty());
    }

    #[test]
    fn parse_tool_call_fragments() {
        let events = parse_sse_data(
            r#"{"choices":[{"delta":{"tool_calls":[
                {"index":0,"id":"call_1","function":{"name":"web_search","arguments":""}},
                {"index":1,"id":"call_2","function":{"name":"other","arguments":""}}
            ]}}]}"#,
        );
        assert_eq!(events.len(), 2);
        for ev in &events {
            assert!(matches!(
                ev.as_ref().unwrap(),
                StreamEvent::ToolCallFragment { .. }
            ));
        }
    }

    #[test]
    fn parse_choiceless_chunk_yields_nothing() {
        let events = parse_sse_data(r#"{"usage":{"total_tokens":12}}"#);
        assert!(events.is_empty());
    }

    #[test]
    fn chat_body_starts_with_system_and_sets_flags() {
        let upstream = OpenAiUpstream::from_config(&Default::default()).unwrap();
        let req = ChatRequest {
            messages: vec![Message::system("sys"), Message::user("hi")],
            enable_thinking: true,
            ..Default::default()
        };
        let body = upstream.build_chat_body(&req);
        assert_eq!(body["model"], "Qwen/Qwen3-0.6B");
        assert_eq!(body["stream"], true);
        assert_eq!(body["chat_template_kwargs"]["enable_thinking"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn chat_body_includes_tools_when_offered() {
        let upstream = OpenAiUpstream::from_config(&Default::default()).unwrap();
        let req = ChatRequest {
            messages: vec![Message::system("sys")],
            tools: vec![serde_json::json!({"type":"function"})],
            tool_choice: Some("auto".into()),
            ..Default::default()
        };
        let body = upstream.build_chat_body(&req);
        assert_eq!(body["tools"].as_array().unwrap().len(), 1);
        assert_eq!(body["tool_choice"], "auto");
    }
}
