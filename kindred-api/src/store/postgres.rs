use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use kindred_shared::clients::db::{create_pool, DbPool};

use super::{Constraint, Store, StoreError, StoreResult};
use crate::models::{
    Block, Like, Match, Message, NewBlock, NewLike, NewMatch, NewMessage, NewProfile, NewReport,
    NewUser, Profile, Report, UpdateProfile, User,
};
use crate::schema::{blocks, likes, matches, messages, profiles, reports, users};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

type Conn = PooledConnection<ConnectionManager<PgConnection>>;

/// Postgres-backed store. Uniqueness rules live in the schema (see the
/// migrations); unique violations come back as [`StoreError::Conflict`].
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn connect(database_url: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = create_pool(database_url, pool_size)?;
        let store = Self { pool };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
        tracing::info!(count = applied.len(), "database migrations applied");
        Ok(())
    }

    fn conn(&self) -> StoreResult<Conn> {
        Ok(self.pool.get()?)
    }
}

/// Maps a unique violation to the constraint it names; everything else stays a
/// database error.
fn classify(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
            let constraint = match info.constraint_name() {
                Some("users_username_key") => Constraint::Username,
                Some("users_email_key") => Constraint::Email,
                Some("likes_sender_id_receiver_id_key") => Constraint::LikePair,
                Some("matches_pair_idx") => Constraint::MatchPair,
                Some("blocks_blocker_id_blocked_id_key") => Constraint::BlockPair,
                _ => Constraint::Other,
            };
            StoreError::Conflict(constraint)
        }
        other => StoreError::Database(other),
    }
}

impl Store for PgStore {
    fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    // --- Users ---

    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut conn = self.conn()?;
        diesel::insert_into(users::table)
            .values(&new)
            .get_result::<User>(&mut conn)
            .map_err(classify)
    }

    fn get_user(&self, id: i32) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table.find(id).first::<User>(&mut conn).optional()?)
    }

    // --- Profiles ---

    fn create_profile(&self, new: NewProfile) -> StoreResult<Profile> {
        let mut conn = self.conn()?;
        diesel::insert_into(profiles::table)
            .values(&new)
            .get_result::<Profile>(&mut conn)
            .map_err(classify)
    }

    fn get_profile(&self, id: i32) -> StoreResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table.find(id).first::<Profile>(&mut conn).optional()?)
    }

    fn get_profile_by_user_id(&self, user_id: i32) -> StoreResult<Option<Profile>> {
        let mut conn = self.conn()?;
        Ok(profiles::table
            .filter(profiles::user_id.eq(user_id))
            .order(profiles::id.asc())
            .first::<Profile>(&mut conn)
            .optional()?)
    }

    fn update_profile(&self, id: i32, changes: UpdateProfile) -> StoreResult<Option<Profile>> {
        // Diesel refuses an UPDATE with an empty SET clause.
        if changes.is_empty() {
            return self.get_profile(id);
        }

        let mut conn = self.conn()?;
        Ok(diesel::update(profiles::table.find(id))
            .set(&changes)
            .get_result::<Profile>(&mut conn)
            .optional()?)
    }

    fn list_active_profiles(&self, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        let mut query = profiles::table
            .filter(profiles::is_active.eq(true))
            .into_boxed();
        if let Some(excluded) = exclude_user_id {
            query = query.filter(profiles::user_id.ne(excluded));
        }

        Ok(query
            .order((profiles::created_at.desc(), profiles::id.desc()))
            .load::<Profile>(&mut conn)?)
    }

    fn search_profiles(&self, query: &str, exclude_user_id: Option<i32>) -> StoreResult<Vec<Profile>> {
        let mut conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(query));
        let mut q = profiles::table
            .filter(profiles::is_active.eq(true))
            .filter(
                profiles::name
                    .ilike(pattern.clone())
                    .or(profiles::bio.ilike(pattern.clone()))
                    .or(profiles::location.ilike(pattern)),
            )
            .into_boxed();
        if let Some(excluded) = exclude_user_id {
            q = q.filter(profiles::user_id.ne(excluded));
        }

        Ok(q.order((profiles::created_at.desc(), profiles::id.desc()))
            .load::<Profile>(&mut conn)?)
    }

    // --- Likes ---

    fn create_like(&self, new: NewLike) -> StoreResult<Like> {
        let mut conn = self.conn()?;
        diesel::insert_into(likes::table)
            .values(&new)
            .get_result::<Like>(&mut conn)
            .map_err(classify)
    }

    fn find_like(&self, sender_id: i32, receiver_id: i32) -> StoreResult<Option<Like>> {
        let mut conn = self.conn()?;
        Ok(likes::table
            .filter(likes::sender_id.eq(sender_id))
            .filter(likes::receiver_id.eq(receiver_id))
            .first::<Like>(&mut conn)
            .optional()?)
    }

    fn likes_sent_by(&self, sender_id: i32) -> StoreResult<Vec<Like>> {
        let mut conn = self.conn()?;
        Ok(likes::table
            .filter(likes::sender_id.eq(sender_id))
            .order(likes::id.asc())
            .load::<Like>(&mut conn)?)
    }

    // --- Matches ---

    fn create_match(&self, new: NewMatch) -> StoreResult<Match> {
        let mut conn = self.conn()?;
        diesel::insert_into(matches::table)
            .values(&new)
            .get_result::<Match>(&mut conn)
            .map_err(classify)
    }

    fn find_match(&self, a: i32, b: i32) -> StoreResult<Option<Match>> {
        let mut conn = self.conn()?;
        Ok(matches::table
            .filter(
                matches::user_id_1.eq(a).and(matches::user_id_2.eq(b))
                    .or(matches::user_id_1.eq(b).and(matches::user_id_2.eq(a))),
            )
            .first::<Match>(&mut conn)
            .optional()?)
    }

    fn matches_for_user(&self, user_id: i32) -> StoreResult<Vec<Match>> {
        let mut conn = self.conn()?;
        Ok(matches::table
            .filter(matches::user_id_1.eq(user_id).or(matches::user_id_2.eq(user_id)))
            .order(matches::id.asc())
            .load::<Match>(&mut conn)?)
    }

    // --- Messages ---

    fn create_message(&self, new: NewMessage) -> StoreResult<Message> {
        let mut conn = self.conn()?;
        diesel::insert_into(messages::table)
            .values(&new)
            .get_result::<Message>(&mut conn)
            .map_err(classify)
    }

    fn get_message(&self, id: i32) -> StoreResult<Option<Message>> {
        let mut conn = self.conn()?;
        Ok(messages::table.find(id).first::<Message>(&mut conn).optional()?)
    }

    fn messages_involving(&self, user_id: i32) -> StoreResult<Vec<Message>> {
        let mut conn = self.conn()?;
        Ok(messages::table
            .filter(messages::sender_id.eq(user_id).or(messages::receiver_id.eq(user_id)))
            .order((messages::sent_at.desc(), messages::id.desc()))
            .load::<Message>(&mut conn)?)
    }

    fn messages_between(&self, a: i32, b: i32) -> StoreResult<Vec<Message>> {
        let mut conn = self.conn()?;
        Ok(messages::table
            .filter(
                messages::sender_id.eq(a).and(messages::receiver_id.eq(b))
                    .or(messages::sender_id.eq(b).and(messages::receiver_id.eq(a))),
            )
            .order((messages::sent_at.desc(), messages::id.desc()))
            .load::<Message>(&mut conn)?)
    }

    fn mark_message_read(&self, id: i32) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let updated = diesel::update(messages::table.find(id))
            .set(messages::is_read.eq(true))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    // --- Blocks ---

    fn create_block(&self, new: NewBlock) -> StoreResult<Block> {
        let mut conn = self.conn()?;
        diesel::insert_into(blocks::table)
            .values(&new)
            .get_result::<Block>(&mut conn)
            .map_err(classify)
    }

    fn find_block(&self, blocker_id: i32, blocked_id: i32) -> StoreResult<Option<Block>> {
        let mut conn = self.conn()?;
        Ok(blocks::table
            .filter(blocks::blocker_id.eq(blocker_id))
            .filter(blocks::blocked_id.eq(blocked_id))
            .first::<Block>(&mut conn)
            .optional()?)
    }

    fn blocks_by(&self, blocker_id: i32) -> StoreResult<Vec<Block>> {
        let mut conn = self.conn()?;
        Ok(blocks::table
            .filter(blocks::blocker_id.eq(blocker_id))
            .order(blocks::id.asc())
            .load::<Block>(&mut conn)?)
    }

    // --- Reports ---

    fn create_report(&self, new: NewReport) -> StoreResult<Report> {
        let mut conn = self.conn()?;
        diesel::insert_into(reports::table)
            .values(&new)
            .get_result::<Report>(&mut conn)
            .map_err(classify)
    }

    fn get_report(&self, id: i32) -> StoreResult<Option<Report>> {
        let mut conn = self.conn()?;
        Ok(reports::table.find(id).first::<Report>(&mut conn).optional()?)
    }

    fn reports_by(&self, reporter_id: i32) -> StoreResult<Vec<Report>> {
        let mut conn = self.conn()?;
        Ok(reports::table
            .filter(reports::reporter_id.eq(reporter_id))
            .order(reports::id.asc())
            .load::<Report>(&mut conn)?)
    }

    fn advance_report_status(&self, id: i32, from: &str, to: &str) -> StoreResult<Option<Report>> {
        let mut conn = self.conn()?;
        Ok(diesel::update(
            reports::table
                .filter(reports::id.eq(id))
                .filter(reports::status.eq(from)),
        )
        .set(reports::status.eq(to))
        .get_result::<Report>(&mut conn)
        .optional()?)
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    struct Violation(&'static str);

    impl DatabaseErrorInformation for Violation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            Some(self.0)
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn unique_violation(name: &'static str) -> DieselError {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, Box::new(Violation(name)))
    }

    #[test]
    fn unique_violations_map_to_their_constraint() {
        let cases = [
            ("users_username_key", Constraint::Username),
            ("users_email_key", Constraint::Email),
            ("likes_sender_id_receiver_id_key", Constraint::LikePair),
            ("matches_pair_idx", Constraint::MatchPair),
            ("blocks_blocker_id_blocked_id_key", Constraint::BlockPair),
            ("something_else_key", Constraint::Other),
        ];
        for (name, expected) in cases {
            match classify(unique_violation(name)) {
                StoreError::Conflict(found) => assert_eq!(found, expected, "{name}"),
                other => panic!("{name}: expected a conflict, got {other:?}"),
            }
        }
    }

    #[test]
    fn other_database_errors_are_not_conflicts() {
        assert!(matches!(classify(DieselError::NotFound), StoreError::Database(DieselError::NotFound)));

        let fk = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new(Violation("likes_sender_id_fkey")),
        );
        assert!(matches!(classify(fk), StoreError::Database(_)));
    }

    /// Tests below run against a live database and mutate it. Run them with
    /// `KINDRED_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.
    mod live {
        use super::*;
        use crate::models::ReportStatus;
        use crate::services::{accounts, matching, moderation};
        use kindred_shared::errors::ErrorCode;
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;
        use std::time::{SystemTime, UNIX_EPOCH};

        fn store() -> PgStore {
            let url = std::env::var("KINDRED_TEST_DATABASE_URL").expect("KINDRED_TEST_DATABASE_URL");
            PgStore::connect(&url, 4).expect("connect to test database")
        }

        /// Names that do not collide with earlier runs against the same database.
        fn unique(prefix: &str) -> String {
            static SEQ: AtomicU32 = AtomicU32::new(0);
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
            format!("{prefix}{nanos}_{}", SEQ.fetch_add(1, Ordering::Relaxed))
        }

        fn user(store: &PgStore, prefix: &str) -> User {
            let name = unique(prefix);
            store
                .create_user(NewUser {
                    email: format!("{name}@example.com"),
                    username: name,
                    password_hash: "not-a-real-hash".into(),
                })
                .unwrap()
        }

        #[test]
        #[ignore = "needs Postgres via KINDRED_TEST_DATABASE_URL"]
        fn duplicate_like_is_rejected_by_the_schema() {
            let store = store();
            let a = user(&store, "pl");
            let b = user(&store, "pl");

            matching::record_like(&store, a.id, b.id, true).unwrap();
            let err = matching::record_like(&store, a.id, b.id, true).unwrap_err();
            assert_eq!(err.code(), ErrorCode::DuplicateLike);
            assert_eq!(err.code().code(), "E2001");
        }

        #[test]
        #[ignore = "needs Postgres via KINDRED_TEST_DATABASE_URL"]
        fn match_pair_is_unique_in_either_order() {
            let store = store();
            let a = user(&store, "pm");
            let b = user(&store, "pm");

            store.create_match(NewMatch { user_id_1: a.id, user_id_2: b.id }).unwrap();
            let err = store
                .create_match(NewMatch { user_id_1: b.id, user_id_2: a.id })
                .unwrap_err();
            assert!(matches!(err, StoreError::Conflict(Constraint::MatchPair)));
            assert!(store.find_match(b.id, a.id).unwrap().is_some());
        }

        #[test]
        #[ignore = "needs Postgres via KINDRED_TEST_DATABASE_URL"]
        fn concurrent_reciprocal_likes_yield_one_match() {
            let store = Arc::new(store());
            for _ in 0..10 {
                let a = user(&store, "pc");
                let b = user(&store, "pc");

                let handles: Vec<_> = [(a.id, b.id), (b.id, a.id)]
                    .into_iter()
                    .map(|(s, r)| {
                        let store = store.clone();
                        std::thread::spawn(move || matching::record_like(&*store, s, r, true).unwrap())
                    })
                    .collect();
                let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

                assert_eq!(store.matches_for_user(a.id).unwrap().len(), 1);
                assert!(outcomes.iter().any(|o| o.matched.is_some()));
            }
        }

        #[test]
        #[ignore = "needs Postgres via KINDRED_TEST_DATABASE_URL"]
        fn duplicate_username_and_email_are_reported_separately() {
            let store = store();
            let name = unique("pu");
            let email = format!("{name}@example.com");
            accounts::create_user(&store, &name, &email, "hunter2hunter2").unwrap();

            let err = accounts::create_user(&store, &name, &format!("x{email}"), "hunter2hunter2").unwrap_err();
            assert_eq!(err.code(), ErrorCode::UsernameTaken);
            assert_eq!(err.code().code(), "E1002");

            let other = unique("pu");
            let err = accounts::create_user(&store, &other, &email.to_uppercase(), "hunter2hunter2").unwrap_err();
            assert_eq!(err.code(), ErrorCode::EmailTaken);
            assert_eq!(err.code().code(), "E1003");
        }

        #[test]
        #[ignore = "needs Postgres via KINDRED_TEST_DATABASE_URL"]
        fn report_status_update_is_compare_and_set() {
            let store = store();
            let a = user(&store, "pr");
            let b = user(&store, "pr");
            let report = moderation::report_user(&store, a.id, b.id, "spam".into(), None).unwrap();

            assert!(store.advance_report_status(report.id, "reviewed", "resolved").unwrap().is_none());
            let resolved = moderation::update_report_status(&store, report.id, ReportStatus::Resolved).unwrap();
            assert_eq!(resolved.status, "resolved");
            let err = moderation::update_report_status(&store, report.id, ReportStatus::Reviewed).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidReportTransition);
        }
    }
}
