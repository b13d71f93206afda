use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::ApiResponse;

use crate::models::{Message, MessageType, MessageWithSender};
use crate::routes::extract::{AppJson, AppPath};
use crate::services::conversations::{self, ConversationSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    /// `text`, `voice` or `video`; defaults to `text`.
    pub message_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: bool,
}

// --- POST /api/messages ---

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let message_type = match req.message_type.as_deref() {
        None => MessageType::default(),
        Some(raw) => raw
            .parse::<MessageType>()
            .map_err(|e| AppError::new(ErrorCode::InvalidMessageType, e))?,
    };

    let message = conversations::send_message(
        state.store.as_ref(),
        req.sender_id,
        req.receiver_id,
        &req.content,
        message_type,
        state.config.enforce_blocks,
    )?;
    Ok(Json(ApiResponse::ok(message)))
}

// --- GET /api/messages/:user_id/:other_id ---

pub async fn list_messages_between(
    State(state): State<Arc<AppState>>,
    AppPath((user_id, other_id)): AppPath<(i32, i32)>,
) -> AppResult<Json<ApiResponse<Vec<MessageWithSender>>>> {
    let messages = conversations::messages_between(state.store.as_ref(), user_id, other_id)?;
    Ok(Json(ApiResponse::ok(messages)))
}

// --- PUT /api/messages/:id/read ---

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<MarkReadResponse>>> {
    let updated = conversations::mark_message_read(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { updated })))
}

// --- GET /api/conversations/:user_id ---

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<MessageWithSender>>>> {
    let messages = conversations::conversations_for_user(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(messages)))
}

// --- GET /api/conversations/:user_id/summary ---

pub async fn conversation_summary(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<ConversationSummary>>>> {
    let summaries = conversations::conversation_summaries(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(summaries)))
}
