use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::schema::{blocks, likes, matches, messages, profiles, reports, users};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub age: i32,
    pub location: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub disability_type: Option<String>,
    pub accessibility_needs: Vec<String>,
    pub communication_preferences: Vec<String>,
    pub photos: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize, Validate, Clone)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: i32,
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(range(min = 18, max = 120, message = "age must be between 18 and 120"))]
    pub age: i32,
    #[validate(length(min = 1, max = 200, message = "location must be 1-200 characters"))]
    pub location: String,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: String,
    #[serde(default)]
    pub interests: Vec<String>,
    pub disability_type: Option<String>,
    #[serde(default)]
    pub accessibility_needs: Vec<String>,
    #[serde(default)]
    pub communication_preferences: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Wraps whatever was sent, `null` included, so a present field is always `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, AsChangeset, Deserialize, Validate, Default, Clone)]
#[diesel(table_name = profiles)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 18, max = 120, message = "age must be between 18 and 120"))]
    pub age: Option<i32>,
    #[validate(length(min = 1, max = 200, message = "location must be 1-200 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 2000, message = "bio must be at most 2000 characters"))]
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    /// Absent leaves the field alone; an explicit `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub disability_type: Option<Option<String>>,
    pub accessibility_needs: Option<Vec<String>>,
    pub communication_preferences: Option<Vec<String>>,
    pub photos: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.location.is_none()
            && self.bio.is_none()
            && self.interests.is_none()
            && self.disability_type.is_none()
            && self.accessibility_needs.is_none()
            && self.communication_preferences.is_none()
            && self.photos.is_none()
            && self.is_active.is_none()
    }

    pub fn apply_to(self, profile: &mut Profile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(location) = self.location {
            profile.location = location;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(interests) = self.interests {
            profile.interests = interests;
        }
        if let Some(disability_type) = self.disability_type {
            profile.disability_type = disability_type;
        }
        if let Some(needs) = self.accessibility_needs {
            profile.accessibility_needs = needs;
        }
        if let Some(prefs) = self.communication_preferences {
            profile.communication_preferences = prefs;
        }
        if let Some(photos) = self.photos {
            profile.photos = photos;
        }
        if let Some(is_active) = self.is_active {
            profile.is_active = is_active;
        }
    }
}

// --- Like ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = likes)]
pub struct Like {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone, Copy)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub sender_id: i32,
    pub receiver_id: i32,
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: i32,
    pub user_id_1: i32,
    pub user_id_2: i32,
    pub matched_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Match {
    pub fn involves(&self, user_id: i32) -> bool {
        self.user_id_1 == user_id || self.user_id_2 == user_id
    }
}

#[derive(Debug, Insertable, Clone, Copy)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user_id_1: i32,
    pub user_id_2: i32,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub message_type: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn involves(&self, user_id: i32) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// The participant on the other side from `user_id`.
    pub fn counterparty(&self, user_id: i32) -> i32 {
        if self.sender_id == user_id {
            self.receiver_id
        } else {
            self.sender_id
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub message_type: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Voice,
    Video,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Video => "video",
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown message type '{other}'")),
        }
    }
}

// --- Block ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = blocks)]
pub struct Block {
    pub id: i32,
    pub blocker_id: i32,
    pub blocked_id: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = blocks)]
pub struct NewBlock {
    pub blocker_id: i32,
    pub blocked_id: i32,
    pub reason: Option<String>,
}

// --- Report ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = reports)]
pub struct Report {
    pub id: i32,
    pub reporter_id: i32,
    pub reported_id: i32,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = reports)]
pub struct NewReport {
    pub reporter_id: i32,
    pub reported_id: i32,
    pub reason: String,
    pub description: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Resolved => "resolved",
        }
    }

    /// Reports only move forward: pending → reviewed → resolved, and a
    /// pending report may be resolved directly.
    pub fn can_advance_to(&self, next: ReportStatus) -> bool {
        next > *self
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("unknown report status '{other}'")),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Composite views ---

#[derive(Debug, Serialize, Clone)]
pub struct ProfileWithUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub user: User,
}

#[derive(Debug, Serialize, Clone)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: Message,
    pub sender: User,
}

#[derive(Debug, Serialize, Clone)]
pub struct MatchWithProfiles {
    #[serde(flatten)]
    pub matched: Match,
    pub profile1: ProfileWithUser,
    pub profile2: ProfileWithUser,
}

impl MatchWithProfiles {
    /// The member profile that is not `user_id`'s own.
    pub fn other_profile(&self, user_id: i32) -> &ProfileWithUser {
        if self.profile1.profile.user_id == user_id {
            &self.profile2
        } else {
            &self.profile1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_status_moves_forward_only() {
        assert!(ReportStatus::Pending.can_advance_to(ReportStatus::Reviewed));
        assert!(ReportStatus::Pending.can_advance_to(ReportStatus::Resolved));
        assert!(ReportStatus::Reviewed.can_advance_to(ReportStatus::Resolved));
        assert!(!ReportStatus::Resolved.can_advance_to(ReportStatus::Pending));
        assert!(!ReportStatus::Reviewed.can_advance_to(ReportStatus::Reviewed));
    }

    #[test]
    fn message_type_parses_known_kinds() {
        assert_eq!("voice".parse::<MessageType>().unwrap(), MessageType::Voice);
        assert!("fax".parse::<MessageType>().is_err());
        assert_eq!(MessageType::default().as_str(), "text");
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn new_profile_rejects_minors() {
        let profile = NewProfile {
            user_id: 1,
            name: "Sam".into(),
            age: 16,
            location: "Leeds".into(),
            bio: String::new(),
            interests: vec![],
            disability_type: None,
            accessibility_needs: vec![],
            communication_preferences: vec![],
            photos: vec![],
            is_active: true,
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn update_distinguishes_absent_from_null_disability_type() {
        let absent: UpdateProfile = serde_json::from_str(r#"{"bio":"hi"}"#).unwrap();
        assert_eq!(absent.disability_type, None);

        let cleared: UpdateProfile = serde_json::from_str(r#"{"disability_type":null}"#).unwrap();
        assert_eq!(cleared.disability_type, Some(None));
        assert!(!cleared.is_empty());

        let set: UpdateProfile = serde_json::from_str(r#"{"disability_type":"hearing"}"#).unwrap();
        assert_eq!(set.disability_type, Some(Some("hearing".to_string())));
    }
}
