//! History routes: reading, saving, loading, and clearing the message log.

use crate::error::ApiError;
use crate::{ApiResponse, SharedState};
use axum::extract::{Query, State};
use axum::response::Json;
use parlance_core::message::Message;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub filepath: String,
}

/// `GET /history?limit=N` — the message log, most recent messages last.
pub async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> std::result::Result<Json<HistoryResponse>, ApiError> {
    let agent = state.manager.get().await?;
    let messages = agent.messages(query.limit).await;
    let total = messages.len();
    Ok(Json(HistoryResponse { messages, total }))
}

/// `POST /history/save` — snapshot the log to a new timestamped file.
pub async fn save_history(
    State(state): State<SharedState>,
) -> std::result::Result<Json<ApiResponse>, ApiError> {
    let agent = state.manager.get().await?;
    let path = agent.save_history().await?;
    Ok(Json(
        ApiResponse::ok(format!("Conversation saved to {}", path.display())).with_data(json!({
            "directory": agent.history_dir().display().to_string(),
        })),
    ))
}

/// `POST /history/load` — replace the log with a snapshot's contents.
pub async fn load_history(
    State(state): State<SharedState>,
    Json(request): Json<LoadRequest>,
) -> std::result::Result<Json<ApiResponse>, ApiError> {
    let agent = state.manager.get().await?;
    let count = agent.load_history(Path::new(&request.filepath)).await?;
    Ok(Json(
        ApiResponse::ok(format!("Loaded {count} messages")).with_data(json!({
            "message_count": count,
        })),
    ))
}

/// `DELETE /history` — same effect as `/chat/reset`.
pub async fn clear_history(
    State(state): State<SharedState>,
) -> std::result::Result<Json<ApiResponse>, ApiError> {
    let agent = state.manager.get().await?;
    agent.clear().await;
    Ok(Json(ApiResponse::ok("Conversation history cleared")))
}
