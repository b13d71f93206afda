use validator::Validate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewProfile, Profile, ProfileWithUser, UpdateProfile};
use crate::services::accounts;
use crate::store::Store;

pub fn create_profile(store: &dyn Store, new: NewProfile) -> AppResult<Profile> {
    new.validate()?;
    accounts::require_user(store, new.user_id)?;

    let profile = store.create_profile(new)?;
    tracing::info!(profile_id = profile.id, user_id = profile.user_id, "profile created");
    Ok(profile)
}

pub fn get_profile_by_user(store: &dyn Store, user_id: i32) -> AppResult<Profile> {
    store.get_profile_by_user_id(user_id)?.ok_or_else(|| {
        AppError::new(ErrorCode::ProfileNotFound, format!("no profile for user {user_id}"))
    })
}

pub fn update_profile(store: &dyn Store, id: i32, changes: UpdateProfile) -> AppResult<Profile> {
    changes.validate()?;

    store
        .update_profile(id, changes)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, format!("profile {id} not found")))
}

/// The profile owned by `user_id` joined with its user row, or `None` when
/// either side is missing.
pub fn profile_with_user(store: &dyn Store, user_id: i32) -> AppResult<Option<ProfileWithUser>> {
    let Some(profile) = store.get_profile_by_user_id(user_id)? else {
        return Ok(None);
    };
    let Some(user) = store.get_user(profile.user_id)? else {
        return Ok(None);
    };
    Ok(Some(ProfileWithUser { profile, user }))
}

fn join_users(store: &dyn Store, profiles: Vec<Profile>) -> AppResult<Vec<ProfileWithUser>> {
    let mut joined = Vec::with_capacity(profiles.len());
    for profile in profiles {
        if let Some(user) = store.get_user(profile.user_id)? {
            joined.push(ProfileWithUser { profile, user });
        }
    }
    Ok(joined)
}

pub fn list_profiles(store: &dyn Store, exclude_user_id: Option<i32>) -> AppResult<Vec<ProfileWithUser>> {
    let profiles = store.list_active_profiles(exclude_user_id)?;
    join_users(store, profiles)
}

pub fn search_profiles(
    store: &dyn Store,
    query: &str,
    exclude_user_id: Option<i32>,
) -> AppResult<Vec<ProfileWithUser>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::validation("search query is required"));
    }

    let profiles = store.search_profiles(query, exclude_user_id)?;
    join_users(store, profiles)
}
