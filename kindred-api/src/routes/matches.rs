use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::types::ApiResponse;

use crate::models::MatchWithProfiles;
use crate::routes::extract::AppPath;
use crate::services::matching;
use crate::AppState;

/// GET /api/matches/:user_id
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Vec<MatchWithProfiles>>>> {
    let matches = matching::matches_for_user(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(matches)))
}
