use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::types::ApiResponse;

use crate::models::Like;
use crate::routes::extract::{AppJson, AppPath};
use crate::services::matching::{self, LikeOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SendLikeRequest {
    pub sender_id: i32,
    pub receiver_id: i32,
}

/// POST /api/likes - like a profile; completes a match when the like is mutual
pub async fn send_like(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SendLikeRequest>,
) -> AppResult<Json<ApiResponse<LikeOutcome>>> {
    let outcome = matching::record_like(
        state.store.as_ref(),
        req.sender_id,
        req.receiver_id,
        state.config.enforce_blocks,
    )?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// GET /api/likes/:user_id - likes sent by a user
pub async fn list_likes(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<Like>>>> {
    let likes = matching::likes_sent_by(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(likes)))
}
