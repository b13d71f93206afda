//! Likes and the mutual matches they produce.

use metrics::counter;
use serde::Serialize;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Like, Match, MatchWithProfiles, NewLike, NewMatch};
use crate::services::{accounts, moderation, profiles};
use crate::store::{Store, StoreError};

#[derive(Debug, Serialize, Clone)]
pub struct LikeOutcome {
    pub like: Like,
    /// The match this like completed, if the other user had already liked back.
    #[serde(rename = "match")]
    pub matched: Option<Match>,
}

/// Records `sender_id`'s like of `receiver_id` and, when the reverse like
/// already exists, the resulting match.
///
/// Uniqueness is left to the store: a repeated like is rejected by the insert
/// itself, and a match that another request created first is looked up rather
/// than duplicated.
pub fn record_like(
    store: &dyn Store,
    sender_id: i32,
    receiver_id: i32,
    enforce_blocks: bool,
) -> AppResult<LikeOutcome> {
    if sender_id == receiver_id {
        return Err(AppError::new(ErrorCode::CannotLikeSelf, "you cannot like yourself"));
    }
    accounts::require_user(store, sender_id)?;
    accounts::require_user(store, receiver_id)?;
    if enforce_blocks {
        moderation::ensure_not_blocked(store, sender_id, receiver_id)?;
    }

    let like = store
        .create_like(NewLike { sender_id, receiver_id })
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::new(ErrorCode::DuplicateLike, "already liked this profile")
            }
            other => other.into(),
        })?;

    counter!("likes_recorded_total").increment(1);
    tracing::info!(like_id = like.id, sender_id, receiver_id, "like recorded");

    let matched = match store.find_like(receiver_id, sender_id)? {
        Some(_) => Some(ensure_match(store, sender_id, receiver_id)?),
        None => None,
    };

    Ok(LikeOutcome { like, matched })
}

fn ensure_match(store: &dyn Store, user_id_1: i32, user_id_2: i32) -> AppResult<Match> {
    match store.create_match(NewMatch { user_id_1, user_id_2 }) {
        Ok(matched) => {
            counter!("matches_created_total").increment(1);
            tracing::info!(match_id = matched.id, user_id_1, user_id_2, "match created");
            Ok(matched)
        }
        Err(StoreError::Conflict(_)) => {
            tracing::debug!(user_id_1, user_id_2, "match already exists");
            store.find_match(user_id_1, user_id_2)?.ok_or_else(|| {
                AppError::internal("match insert conflicted but no match was found")
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub fn likes_sent_by(store: &dyn Store, user_id: i32) -> AppResult<Vec<Like>> {
    Ok(store.likes_sent_by(user_id)?)
}

/// Every match involving `user_id`, each with both members' profiles.
/// Matches where either member has no profile (or no user row) are left out.
pub fn matches_for_user(store: &dyn Store, user_id: i32) -> AppResult<Vec<MatchWithProfiles>> {
    let rows = store.matches_for_user(user_id)?;
    let mut results = Vec::with_capacity(rows.len());

    for matched in rows {
        let profile1 = profiles::profile_with_user(store, matched.user_id_1)?;
        let profile2 = profiles::profile_with_user(store, matched.user_id_2)?;

        match (profile1, profile2) {
            (Some(profile1), Some(profile2)) => results.push(MatchWithProfiles {
                matched,
                profile1,
                profile2,
            }),
            _ => tracing::warn!(
                match_id = matched.id,
                user_id_1 = matched.user_id_1,
                user_id_2 = matched.user_id_2,
                "skipping match with a missing member profile"
            ),
        }
    }

    Ok(results)
}
