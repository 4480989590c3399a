//! crates/study_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Represents a user - the identity anchor every other record hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    pub current_streak: u32,
    /// Never decreases over the lifetime of the user.
    pub max_streak: u32,
    pub last_study_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// One day's study entry. Several logs on the same date are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub study_date: NaiveDate,
    pub content: String,
    pub duration_minutes: u32,
    pub reflection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A completed focus interval. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomodoroSession {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Weak link to the day's study log; cleared when that log is deleted.
    pub study_log_id: Option<Uuid>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

/// A study log together with the pomodoro sessions linked to it.
#[derive(Debug, Clone)]
pub struct StudyLogDetail {
    pub log: StudyLog,
    pub pomodoro_sessions: Vec<PomodoroSession>,
}

/// A study log annotated with how many pomodoro sessions are linked to it.
#[derive(Debug, Clone)]
pub struct StudyLogSummary {
    pub log: StudyLog,
    pub pomodoro_count: u64,
}

/// One page of a listing, plus the size of the whole filtered set.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakSummary {
    pub current_streak: u32,
    pub max_streak: u32,
}

/// Today's pomodoro sessions for the timer screen.
#[derive(Debug, Clone)]
pub struct TodaySummary {
    pub count: u64,
    pub sessions: Vec<PomodoroSession>,
}

/// Aggregates the badge rules are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub study_log_count: u64,
    pub pomodoro_count: u64,
    pub total_study_minutes: u64,
    pub max_streak: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardedBadge {
    pub user_id: Uuid,
    pub badge_id: String,
    pub awarded_at: DateTime<Utc>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Fields written when a study log is created or overwritten.
#[derive(Debug, Clone)]
pub struct StudyLogFields {
    pub study_date: NaiveDate,
    pub content: String,
    pub duration_minutes: u32,
    pub reflection: Option<String>,
}

/// Inclusive, independent bounds on `study_date` for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_bounds_are_inclusive_and_independent() {
        let both = DateRange {
            start: Some(date(2025, 3, 1)),
            end: Some(date(2025, 3, 31)),
        };
        assert!(both.contains(date(2025, 3, 1)));
        assert!(both.contains(date(2025, 3, 31)));
        assert!(!both.contains(date(2025, 4, 1)));

        let only_end = DateRange {
            start: None,
            end: Some(date(2025, 3, 1)),
        };
        assert!(only_end.contains(date(1999, 1, 1)));
        assert!(!only_end.contains(date(2025, 3, 2)));

        assert!(DateRange::default().contains(date(2025, 1, 1)));
    }
}
