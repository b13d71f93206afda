use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use kindred_shared::errors::AppResult;
use kindred_shared::types::ApiResponse;

use crate::models::User;
use crate::routes::extract::{AppJson, AppPath};
use crate::services::accounts;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub username: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

// --- POST /api/users ---

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()?;

    let user = accounts::create_user(state.store.as_ref(), &req.username, &req.email, &req.password)?;
    Ok(Json(ApiResponse::ok(user)))
}

// --- GET /api/users/:id ---

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = accounts::get_user(state.store.as_ref(), id)?;
    Ok(Json(ApiResponse::ok(user)))
}
