use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::types::ApiResponse;

use crate::models::{NewProfile, Profile, ProfileWithUser, UpdateProfile};
use crate::routes::extract::{AppJson, AppPath, AppQuery};
use crate::services::profiles;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProfilesQuery {
    pub exclude_user_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchProfilesQuery {
    #[serde(default)]
    pub q: String,
    pub exclude_user_id: Option<i32>,
}

// --- POST /api/profiles ---

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<NewProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profiles::create_profile(state.store.as_ref(), payload)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /api/profiles ---

pub async fn list_profiles(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<ListProfilesQuery>,
) -> AppResult<Json<ApiResponse<Vec<ProfileWithUser>>>> {
    let listed = profiles::list_profiles(state.store.as_ref(), query.exclude_user_id)?;
    Ok(Json(ApiResponse::ok(listed)))
}

// --- GET /api/profiles/search ---

pub async fn search_profiles(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<SearchProfilesQuery>,
) -> AppResult<Json<ApiResponse<Vec<ProfileWithUser>>>> {
    let found = profiles::search_profiles(state.store.as_ref(), &query.q, query.exclude_user_id)?;
    Ok(Json(ApiResponse::ok(found)))
}

// --- GET /api/profiles/user/:user_id ---

pub async fn get_profile_by_user(
    State(state): State<Arc<AppState>>,
    AppPath(user_id): AppPath<i32>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profiles::get_profile_by_user(state.store.as_ref(), user_id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /api/profiles/:id ---

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profiles::update_profile(state.store.as_ref(), id, payload)?;
    Ok(Json(ApiResponse::ok(profile)))
}
