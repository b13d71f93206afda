use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{Constraint, Store, StoreError, StoreResult};
use crate::models::{
    Block, Like, Match, Message, NewBlock, NewLike, NewMatch, NewMessage, NewProfile, NewReport,
    NewUser, Profile, Report, UpdateProfile, User,
};

/// Arena-style store: each table is a `Vec` whose index + 1 is the row id.
/// A single mutex covers all tables, so a uniqueness check and the insert it
/// guards always happen under the same guard.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    profiles: Vec<Profile>,
    likes: Vec<Like>,
    matches: Vec<Match>,
    messages: Vec<Message>,
    blocks: Vec<Block>,
    reports: Vec<Report>,
    like_pairs: HashMap<(i32, i32), usize>,
    match_pairs: HashMap<(i32, i32), usize>,
    block_pairs: HashMap<(i32, i32), usize>,
}

fn next_id(len: usize) -> StoreResult<i32> {
    len.checked_add(1)
        .and_then(|id| i32::try_from(id).ok())
        .ok_or(StoreError::IdsExhausted)
}

fn slot(id: i32) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

fn unordered(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Tables {
    fn active_profiles(&self, exclude_user_id: Option<i32>) -> impl Iterator<Item = &Profile> + '_ {
        self.profiles
            .iter()
            .filter(|p| p.is_active)
            .filter(move |p| Some(p.user_id) != exclude_user_id)
    }
}

fn newest_first_profiles(mut profiles: Vec<Profile>) -> Vec<Profile> {
    profiles.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    profiles
}

fn newest_first_messages(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| (b.sent_at, b.id).cmp(&(a.sent_at, a.id)));
    messages
}

impl Store for MemoryStore {
    fn ping(&self) -> StoreResult<()> {
        self.tables().map(|_| ())
    }

    // --- Users ---

    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut t = self.tables()?;
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(StoreError::Conflict(Constraint::Username));
        }
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Conflict(Constraint::Email));
        }

        let user = User {
            id: next_id(t.users.len())?,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let t = self.tables()?;
        Ok(slot(id).and_then(|i| t.users.get(i)).cloned())
    }

    // --- Profiles ---

    fn create_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        let mut t = self.tables()?;
        let profile = Profile {
            id: next_id(t.profiles.len())?,
            user_id: new.user_id,
            name: new.name,
            age: new.age,
            location: new.location,
            bio: new.bio,
            interests: new.interests,
            disability_type: new.disability_type,
            accessibility_needs: new.accessibility_needs,
            communication_preferences: new.communication_preferences,
            photos: new.photos,
            is_active: new.is_active,
            created_at: Utc::now(),
        };
        t.profiles.push(profile.clone());
        Ok(profile)
    }

    fn get_profile(&self, id: i32) -> StoreResult<Option<Profile>> {
        let t = self.tables()?;
        Ok(slot(id).and_then(|i| t.profiles.get(i)).cloned())
    }

    fn get_profile_by_user_id(&self, user_id: i32) -> StoreResult<Option<Profile>> {
        let t = self.tables()?;
        Ok(t.profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    fn update_profile(&self, id: i32, changes: UpdateProfile) -> StoreResult<Option<Profile>> {
        let mut t = self.tables()?;
        let Some(profile) = slot(id).and_then(|i| t.profiles.get_mut(i)) else {
            return Ok(None);
        };
        changes.apply_to(profile);
        Ok(Some(profile.clone()))
    }

    fn list_active_profiles(&self, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>> {
        let t = self.tables()?;
        let profiles = t.active_profiles(exclude_user_id).cloned().collect();
        Ok(newest_first_profiles(profiles))
    }

    fn search_profiles(&self, query: &str, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>> {
        let needle = query.to_lowercase();
        let t = self.tables()?;
        let profiles = t
            .active_profiles(exclude_user_id)
            .filter(|p| {
                contains_ignore_case(&p.name, &needle)
                    || contains_ignore_case(&p.bio, &needle)
                    || contains_ignore_case(&p.location, &needle)
            })
            .cloned()
            .collect();
        Ok(newest_first_profiles(profiles))
    }

    // --- Likes ---

    fn create_like(&self, new: NewLike) -> StoreResult<Like> {
        let mut t = self.tables()?;
        let key = (new.sender_id, new.receiver_id);
        if t.like_pairs.contains_key(&key) {
            return Err(StoreError::Conflict(Constraint::LikePair));
        }

        let like = Like {
            id: next_id(t.likes.len())?,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            created_at: Utc::now(),
        };
        let index = t.likes.len();
        t.likes.push(like.clone());
        t.like_pairs.insert(key, index);
        Ok(like)
    }

    fn find_like(&self, sender_id: i32, receiver_id: i32) -> StoreResult<Option<Like>> {
        let t = self.tables()?;
        Ok(t.like_pairs
            .get(&(sender_id, receiver_id))
            .map(|&i| t.likes[i].clone()))
    }

    fn likes_sent_by(&self, sender_id: i32) -> StoreResult<Vec<Like>> {
        let t = self.tables()?;
        Ok(t.likes.iter().filter(|l| l.sender_id == sender_id).cloned().collect())
    }

    // --- Matches ---

    fn create_match(&self, new: NewMatch) -> StoreResult<Match> {
        let mut t = self.tables()?;
        let key = unordered(new.user_id_1, new.user_id_2);
        if t.match_pairs.contains_key(&key) {
            return Err(StoreError::Conflict(Constraint::MatchPair));
        }

        let matched = Match {
            id: next_id(t.matches.len())?,
            user_id_1: new.user_id_1,
            user_id_2: new.user_id_2,
            matched_at: Utc::now(),
            is_active: true,
        };
        let index = t.matches.len();
        t.matches.push(matched.clone());
        t.match_pairs.insert(key, index);
        Ok(matched)
    }

    fn find_match(&self, a: i32, b: i32) -> StoreResult<Option<Match>> {
        let t = self.tables()?;
        Ok(t.match_pairs
            .get(&unordered(a, b))
            .map(|&i| t.matches[i].clone()))
    }

    fn matches_for_user(&self, user_id: i32) -> StoreResult<Vec<Match>> {
        let t = self.tables()?;
        Ok(t.matches.iter().filter(|m| m.involves(user_id)).cloned().collect())
    }

    // --- Messages ---

    fn create_message(&self, new: NewMessage) -> StoreResult<Message> {
        let mut t = self.tables()?;
        let message = Message {
            id: next_id(t.messages.len())?,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            content: new.content,
            message_type: new.message_type,
            is_read: new.is_read,
            sent_at: Utc::now(),
        };
        t.messages.push(message.clone());
        Ok(message)
    }

    fn get_message(&self, id: i32) -> StoreResult<Option<Message>> {
        let t = self.tables()?;
        Ok(slot(id).and_then(|i| t.messages.get(i)).cloned())
    }

    fn messages_involving(&self, user_id: i32) -> StoreResult<Vec<Message>> {
        let t = self.tables()?;
        let messages = t.messages.iter().filter(|m| m.involves(user_id)).cloned().collect();
        Ok(newest_first_messages(messages))
    }

    fn messages_between(&self, a: i32, b: i32) -> StoreResult<Vec<Message>> {
        let t = self.tables()?;
        let messages = t
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect();
        Ok(newest_first_messages(messages))
    }

    fn mark_message_read(&self, id: i32) -> StoreResult<bool> {
        let mut t = self.tables()?;
        match slot(id).and_then(|i| t.messages.get_mut(i)) {
            Some(message) => {
                message.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Blocks ---

    fn create_block(&self, new: NewBlock) -> StoreResult<Block> {
        let mut t = self.tables()?;
        let key = (new.blocker_id, new.blocked_id);
        if t.block_pairs.contains_key(&key) {
            return Err(StoreError::Conflict(Constraint::BlockPair));
        }

        let block = Block {
            id: next_id(t.blocks.len())?,
            blocker_id: new.blocker_id,
            blocked_id: new.blocked_id,
            reason: new.reason,
            created_at: Utc::now(),
        };
        let index = t.blocks.len();
        t.blocks.push(block.clone());
        t.block_pairs.insert(key, index);
        Ok(block)
    }

    fn find_block(&self, blocker_id: i32, blocked_id: i32) -> StoreResult<Option<Block>> {
        let t = self.tables()?;
        Ok(t.block_pairs
            .get(&(blocker_id, blocked_id))
            .map(|&i| t.blocks[i].clone()))
    }

    fn blocks_by(&self, blocker_id: i32) -> StoreResult<Vec<Block>> {
        let t = self.tables()?;
        Ok(t.blocks.iter().filter(|b| b.blocker_id == blocker_id).cloned().collect())
    }

    // --- Reports ---

    fn create_report(&self, new: NewReport) -> StoreResult<Report> {
        let mut t = self.tables()?;
        let report = Report {
            id: next_id(t.reports.len())?,
            reporter_id: new.reporter_id,
            reported_id: new.reported_id,
            reason: new.reason,
            description: new.description,
            status: new.status,
            created_at: Utc::now(),
        };
        t.reports.push(report.clone());
        Ok(report)
    }

    fn get_report(&self, id: i32) -> StoreResult<Option<Report>> {
        let t = self.tables()?;
        Ok(slot(id).and_then(|i| t.reports.get(i)).cloned())
    }

    fn reports_by(&self, reporter_id: i32) -> StoreResult<Vec<Report>> {
        let t = self.tables()?;
        Ok(t.reports.iter().filter(|r| r.reporter_id == reporter_id).cloned().collect())
    }

    fn advance_report_status(&self, id: i32, from: &str, to: &str) -> StoreResult<Option<Report>> {
        let mut t = self.tables()?;
        match slot(id).and_then(|i| t.reports.get_mut(i)) {
            Some(report) if report.status == from => {
                report.status = to.to_string();
                Ok(Some(report.clone()))
            }
            _ => Ok(None),
        }
    }
}
