//! Chat routes: streaming SSE turns, synchronous completion, and reset.

use crate::error::ApiError;
use crate::{ApiResponse, SharedState};
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use futures::Stream;
use parlance_agent::{StreamEvent, TurnOutput};
use parlance_core::message::ToolCall;
use parlance_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub content: String,
    /// `null` when the model requested no tool calls.
    pub tool_calls: Option<Vec<ToolCall>>,
    pub timestamp: DateTime<Utc>,
}

/// Trim surrounding whitespace and enforce the length bounds.
fn validated_message(message: &str, max_chars: usize) -> Result<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Validation("Message cannot be empty".into()));
    }
    if message.chars().count() > max_chars {
        return Err(Error::Validation(format!(
            "Message too long (maximum {max_chars} characters)"
        )));
    }
    Ok(message.to_string())
}

fn preview(message: &str) -> String {
    message.chars().take(48).collect()
}

/// `POST /chat` — run one turn, streamed over SSE by default.
///
/// With `stream: false` this behaves exactly like `/chat/completion`.
pub async fn chat(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Response, ApiError> {
    let message = validated_message(&request.message, state.max_message_chars)?;
    info!(
        chars = message.chars().count(),
        stream = request.stream,
        preview = %preview(&message),
        "Chat request"
    );
    let agent = state.manager.get().await?;

    if !request.stream {
        let output = agent.chat(message).await?;
        return Ok(Json(completion_body(output)).into_response());
    }

    let rx = agent.chat_stream(message).await?;
    Ok(Sse::new(event_stream(rx)).into_response())
}

/// `POST /chat/completion` — run one turn and return the whole response.
pub async fn completion(
    State(state): State<SharedState>,
    Json(request): Json<ChatRequest>,
) -> std::result::Result<Json<CompletionResponse>, ApiError> {
    let message = validated_message(&request.message, state.max_message_chars)?;
    info!(
        chars = message.chars().count(),
        preview = %preview(&message),
        "Completion request"
    );
    let agent = state.manager.get().await?;
    let output = agent.chat(message).await?;
    Ok(Json(completion_body(output)))
}

/// `POST /chat/reset` — clear the conversation log.
pub async fn reset(
    State(state): State<SharedState>,
) -> std::result::Result<Json<ApiResponse>, ApiError> {
    let agent = state.manager.get().await?;
    agent.clear().await;
    Ok(Json(ApiResponse::ok("Conversation history cleared")))
}

fn completion_body(output: TurnOutput) -> CompletionResponse {
    CompletionResponse {
        content: output.content,
        tool_calls: (!output.tool_calls.is_empty()).then_some(output.tool_calls),
        timestamp: Utc::now(),
    }
}

/// Turn the agent's delta channel into SSE events.
///
/// Zero or more `content` events, then exactly one terminal `done` or
/// `error`, then the stream ends. Dropping the SSE body drops the receiver,
/// which stops generation on the agent side.
fn event_stream(
    rx: mpsc::Receiver<Result<String>>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    futures::stream::unfold((rx, false), |(mut rx, finished)| async move {
        if finished {
            return None;
        }
        match rx.recv().await {
            Some(Ok(text)) => Some((Ok(sse_event(&StreamEvent::content(text))), (rx, false))),
            Some(Err(e)) => Some((Ok(sse_event(&StreamEvent::error(e.to_string()))), (rx, true))),
            None => Some((Ok(sse_event(&StreamEvent::Done)), (rx, true))),
        }
    })
}

fn sse_event(event: &StreamEvent) -> Event {
    let payload = serde_json::to_string(event)
        .unwrap_or_else(|_| r#"{"type":"error","error":"event serialization failed"}"#.into());
    Event::default().data(payload)
}
