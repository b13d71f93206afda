use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use kindred_shared::errors::{AppError, AppResult};
use kindred_shared::types::ApiResponse;

use crate::models::{Block, Report, ReportStatus};
use crate::routes::extract::{AppJson, AppPath};
use crate::services::moderation;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockUserRequest {
    pub blocker_id: i32,
    pub blocked_id: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportUserRequest {
    pub reporter_id: i32,
    pub reported_id: i32,
    pub reason: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReportStatusRequest {
    pub status: String,
}

/// POST /api/blocks
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<BlockUserRequest>,
) -> AppResult<Json<ApiResponse<Block>>> {
    let block = moderation::block_user(state.store.as_ref(), req.blocker_id, req.blocked_id, req.reason)?;
    Ok(Json(ApiResponse::ok(block)))
}

/// GET /api/blocks/:user_id - users blocked by `user_id`
pub async fn list_blocks(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<Block>>>> {
    let blocks = moderation::blocks_for_user(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(blocks)))
}

/// POST /api/reports
pub async fn report_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ReportUserRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let report = moderation::report_user(
        state.store.as_ref(),
        req.reporter_id,
        req.reported_id,
        req.reason,
        req.description,
    )?;
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/users/:id/reports - reports filed by the user `id`
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<Report>>>> {
    let reports = moderation::reports_by_user(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(reports)))
}

/// PUT /api/reports/:id/status
pub async fn update_report_status(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(req): AppJson<UpdateReportStatusRequest>,
) -> AppResult<Json<ApiResponse<Report>>> {
    let next: ReportStatus = req.status.parse().map_err(AppError::validation)?;
    let report = moderation::update_report_status(state.store.as_ref(), id, next)?;
    Ok(Json(ApiResponse::ok(report)))
}
