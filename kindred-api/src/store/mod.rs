//! Entity storage.
//!
//! Every component receives the store explicitly (through `AppState`), so the
//! same services run against the in-memory arena in tests and against Postgres
//! in deployment.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use kindred_shared::errors::{AppError, ErrorCode};

use crate::models::{
    Block, Like, Match, Message, NewBlock, NewLike, NewMatch, NewMessage, NewProfile, NewReport,
    NewUser, Profile, Report, UpdateProfile, User,
};

/// Which uniqueness rule a rejected insert ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Username,
    Email,
    LikePair,
    MatchPair,
    BlockPair,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0:?}")]
    Conflict(Constraint),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("no ids left in table")]
    IdsExhausted,
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                AppError::new(ErrorCode::Conflict, format!("conflicting record ({constraint:?})"))
            }
            StoreError::Database(e) => AppError::Database(e),
            other => AppError::store_failure(other.to_string()),
        }
    }
}

/// Keyed collections for every entity, with monotonic integer ids assigned on
/// insert. Inserts that would break a uniqueness rule fail with
/// [`StoreError::Conflict`] instead of writing; this is what keeps likes and
/// matches unique under concurrent requests.
pub trait Store: Send + Sync {
    /// Cheap liveness probe used by the health endpoint.
    fn ping(&self) -> StoreResult<()>;

    // Users
    fn create_user(&self, new: NewUser) -> StoreResult<User>;
    fn get_user(&self, id: i32) -> StoreResult<Option<User>>;

    // Profiles
    fn create_profile(&self, new: NewProfile) -> StoreResult<Profile>;
    fn get_profile(&self, id: i32) -> StoreResult<Option<Profile>>;
    fn get_profile_by_user_id(&self, user_id: i32) -> StoreResult<Option<Profile>>;
    fn update_profile(&self, id: i32, changes: UpdateProfile) -> StoreResult<Option<Profile>>;
    /// Active profiles, newest first, optionally leaving out one user's own.
    fn list_active_profiles(&self, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>>;
    /// Active profiles whose name, bio or location contains `query`, ignoring case.
    fn search_profiles(&self, query: &str, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>>;

    // Likes
    fn create_like(&self, new: NewLike) -> StoreResult<Like>;
    fn find_like(&self, sender_id: i32, receiver_id: i32) -> StoreResult<Option<Like>>;
    fn likes_sent_by(&self, sender_id: i32) -> StoreResult<Vec<Like>>;

    // Matches
    fn create_match(&self, new: NewMatch) -> StoreResult<Match>;
    /// The match between two users, in either order.
    fn find_match(&self, a: i32, b: i32) -> StoreResult<Option<Match>>;
    fn matches_for_user(&self, user_id: i32) -> StoreResult<Vec<Match>>;

    // Messages
    fn create_message(&self, new: NewMessage) -> StoreResult<Message>;
    fn get_message(&self, id: i32) -> StoreResult<Option<Message>>;
    /// Every message sent or received by `user_id`, newest first.
    fn messages_involving(&self, user_id: i32) -> StoreResult<Vec<Message>>;
    /// Both directions of the exchange between `a` and `b`, newest first.
    fn messages_between(&self, a: i32, b: i32) -> StoreResult<Vec<Message>>;
    /// Returns whether a message with that id existed.
    fn mark_message_read(&self, id: i32) -> StoreResult<bool>;

    // Blocks
    fn create_block(&self, new: NewBlock) -> StoreResult<Block>;
    fn find_block(&self, blocker_id: i32, blocked_id: i32) -> StoreResult<Option<Block>>;
    fn blocks_by(&self, blocker_id: i32) -> StoreResult<Vec<Block>>;

    // Reports
    fn create_report(&self, new: NewReport) -> StoreResult<Report>;
    fn get_report(&self, id: i32) -> StoreResult<Option<Report>>;
    fn reports_by(&self, reporter_id: i32) -> StoreResult<Vec<Report>>;
    /// Sets the status to `to` only if it is currently `from`. `None` means the
    /// report is missing or its status has already moved on.
    fn advance_report_status(&self, id: i32, from: &str, to: &str) -> StoreResult<Option<Report>>;
}
