//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM, DashScope, and any other
//! endpoint that speaks the `/chat/completions` dialect, streaming or not.

use async_trait::async_trait;
use futures::StreamExt;
use parlance_core::error::ProviderError;
use parlance_core::message::{Message, Role, ToolCall};
use parlance_core::provider::{
    Provider, ProviderRequest, ProviderResponse, ProviderToolDefinition, StreamChunk,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// An OpenAI-compatible inference client.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(to_api_tools(&request.tools));
        }
        body
    }

    /// Map non-200 statuses to provider faults. `Ok` means the response can
    /// be consumed.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let message = response.text().await.unwrap_or_default();
                warn!(status, body = %message, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let message = Message::assistant(choice.message.content.unwrap_or_default())
            .with_tool_calls(tool_calls);

        Ok(ProviderResponse {
            message,
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and decode chunks line by line.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for event in decoder.feed(&String::from_utf8_lossy(&bytes)) {
                    if tx.send(Ok(event)).await.is_err() {
                        return; // receiver dropped
                    }
                }
                if decoder.finished {
                    return;
                }
            }

            // Byte stream ended without a [DONE] marker.
            if !decoder.finished {
                let _ = tx
                    .send(Err(ProviderError::StreamInterrupted(
                        "stream ended unexpectedly".into(),
                    )))
                    .await;
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

// ── SSE decoding ──────────────────────────────────────────────────────────

/// Incremental decoder for the `data: {json}` line protocol.
///
/// Buffers partial lines across network reads, accumulates tool-call deltas
/// by index, and emits [`StreamChunk`]s as complete events arrive.
struct SseDecoder {
    buffer: String,
    /// Keyed by delta index; BTreeMap keeps emitted call order stable.
    accumulators: BTreeMap<u32, ToolCallAccumulator>,
    finished: bool,
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl SseDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
            accumulators: BTreeMap::new(),
            finished: false,
        }
    }

    /// Feed raw text from the wire; returns any chunks completed by it.
    fn feed(&mut self, text: &str) -> Vec<StreamChunk> {
        self.buffer.push_str(text);
        let mut out = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);

            if let Some(chunk) = self.decode_line(&line) {
                out.push(chunk);
            }
            if self.finished {
                break;
            }
        }
        out
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamChunk> {
        // Skip blanks and SSE comments
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data: ")?.trim();

        if data == "[DONE]" {
            self.finished = true;
            let tool_calls = std::mem::take(&mut self.accumulators)
                .into_values()
                .map(|acc| ToolCall {
                    id: acc.id,
                    name: acc.name,
                    arguments: acc.arguments,
                })
                .collect();
            return Some(StreamChunk {
                content: None,
                tool_calls,
                done: true,
            });
        }

        let parsed: StreamResponse = match serde_json::from_str(data) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable stream event");
                return None;
            }
        };

        let choice = parsed.choices.first()?;

        for delta in choice.delta.tool_calls.iter().flatten() {
            let acc = self.accumulators.entry(delta.index).or_default();
            if let Some(ref id) = delta.id {
                acc.id = id.clone();
            }
            if let Some(ref func) = delta.function {
                if let Some(ref name) = func.name {
                    acc.name = name.clone();
                }
                if let Some(ref args) = func.arguments {
                    acc.arguments.push_str(args);
                }
            }
        }

        let content = choice.delta.content.clone().filter(|c| !c.is_empty());
        content.map(|c| StreamChunk {
            content: Some(c),
            tool_calls: Vec::new(),
            done: false,
        })
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct ApiMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            },
            content: Some(m.content.clone()),
            tool_calls: m.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.id,
                            "type": "function",
                            "function": { "name": tc.name, "arguments": tc.arguments },
                        })
                    })
                    .collect()
            }),
            tool_call_id: m.tool_call_id.clone(),
            name: m.name.clone(),
        })
        .collect()
}

fn to_api_tools(tools: &[ProviderToolDefinition]) -> Vec<serde_json::Value> {
    tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                },
            })
        })
        .collect()
}

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Deserialize)]
struct ApiChoiceMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

#[derive(Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_emits_content_deltas_in_order() {
        let mut decoder = SseDecoder::new();
        let chunks = decoder.feed(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
        ));
        let texts: Vec<_> = chunks.iter().filter_map(|c| c.content.clone()).collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
        assert!(!decoder.finished);
    }

    #[test]
    fn decoder_handles_split_lines() {
        let mut decoder = SseDecoder::new();
        let first = decoder.feed("data: {\"choices\":[{\"delta\":{\"con");
        assert!(first.is_empty());
        let second = decoder.feed("tent\":\"hi\"}}]}\n");
        assert_eq!(second[0].content.as_deref(), Some("hi"));
    }

    #[test]
    fn decoder_terminates_on_done_marker() {
        let mut decoder = SseDecoder::new();
        let chunks = decoder.feed("data: [DONE]\n");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].done);
        assert!(decoder.finished);
    }

    #[test]
    fn decoder_accumulates_tool_call_deltas() {
        let mut decoder = SseDecoder::new();
        decoder.feed(concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"calculate\",\"arguments\":\"{\\\"exp\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"r\\\": \\\"2+2\\\"}\"}}]}}]}\n",
        ));
        let done = decoder.feed("data: [DONE]\n");
        let call = &done[0].tool_calls[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "calculate");
        assert_eq!(call.arguments, r#"{"expr": "2+2"}"#);
    }

    #[test]
    fn decoder_skips_comments_and_blanks() {
        let mut decoder = SseDecoder::new();
        let chunks = decoder.feed(": keep-alive\n\n");
        assert!(chunks.is_empty());
    }

    #[test]
    fn api_messages_carry_role_and_tool_linkage() {
        let messages = vec![
            Message::system("be brief"),
            Message::tool_result("call_7", "clock", "12:00"),
        ];
        let api = to_api_messages(&messages);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_7"));
        assert_eq!(api[1].name.as_deref(), Some("clock"));
    }
}
