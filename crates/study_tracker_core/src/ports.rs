//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mailers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    AuthSession, AwardedBadge, DateRange, PomodoroSession, StudyLog, StudyLogFields,
    StudyLogSummary, User, UserStats,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_or_create_user_by_email(&self, email: &str) -> PortResult<User>;

    /// Writes all three streak fields in one update.
    async fn update_user_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        max_streak: u32,
        last_study_date: Option<NaiveDate>,
    ) -> PortResult<()>;

    // --- Study Logs ---
    async fn insert_study_log(&self, user_id: Uuid, fields: StudyLogFields) -> PortResult<StudyLog>;

    /// Returns `None` when the log does not exist or belongs to another user.
    async fn find_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<Option<StudyLog>>;

    /// Overwrites the log only if `user_id` owns it; `None` otherwise.
    async fn update_study_log(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: StudyLogFields,
    ) -> PortResult<Option<StudyLog>>;

    /// Deletes the log only if `user_id` owns it. Returns whether a row went away.
    async fn delete_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<bool>;

    /// Every `study_date` of the user, unordered and possibly repeated.
    async fn list_study_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>>;

    /// Logs ordered by `study_date` descending, each with its pomodoro count.
    async fn find_study_logs(
        &self,
        user_id: Uuid,
        range: DateRange,
        offset: u64,
        limit: u64,
    ) -> PortResult<Vec<StudyLogSummary>>;

    async fn count_study_logs(&self, user_id: Uuid, range: DateRange) -> PortResult<u64>;

    /// The earliest-created log of the user on `date`, if any.
    async fn find_first_study_log_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<StudyLog>>;

    /// Adds `minutes` to the log's duration in a single atomic update.
    async fn add_study_log_minutes(&self, id: Uuid, minutes: u32) -> PortResult<()>;

    // --- Pomodoro Sessions ---
    async fn insert_pomodoro_session(
        &self,
        user_id: Uuid,
        study_log_id: Option<Uuid>,
        duration_minutes: u32,
        completed_at: DateTime<Utc>,
    ) -> PortResult<PomodoroSession>;

    /// Counts sessions with `completed_at` in `[start, end)`.
    async fn count_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64>;

    /// Sessions with `completed_at` in `[start, end)`, newest first.
    async fn list_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<PomodoroSession>>;

    async fn list_pomodoro_sessions_for_log(&self, study_log_id: Uuid) -> PortResult<Vec<PomodoroSession>>;

    // --- Badges ---
    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    async fn list_awarded_badges(&self, user_id: Uuid) -> PortResult<Vec<AwardedBadge>>;

    /// Idempotent. Returns `true` only when the badge was not held before.
    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        awarded_at: DateTime<Utc>,
    ) -> PortResult<bool>;

    // --- Auth Methods ---
    async fn create_magic_link(
        &self,
        token: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Marks the token used and returns its email. Unknown, expired or already
    /// consumed tokens yield `PortError::Unauthorized`.
    async fn consume_magic_link(&self, token: &str, now: DateTime<Utc>) -> PortResult<String>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession>;

    async fn validate_auth_session(&self, session_id: &str, now: DateTime<Utc>) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    /// Deletes expired or consumed magic links and expired sessions, returning
    /// how many rows went.
    async fn purge_expired_auth(&self, now: DateTime<Utc>) -> PortResult<u64>;
}

#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    /// Delivers a sign-in link to the given address.
    async fn send_magic_link(&self, email: &str, url: &str) -> PortResult<()>;
}

/// Source of the current instant. Services never read the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
