//! crates/study_tracker_core/src/streak.rs
//!
//! The streak engine. Streaks are a cached projection of the user's study
//! dates: every mutation recomputes them from scratch instead of adjusting
//! the stored numbers.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::StreakSummary;
use crate::ports::{Clock, DatabaseService, PortResult};
use crate::time::{days_between, Calendar};

/// Length of the run of consecutive days ending at the most recent date,
/// or 0 when that date is older than yesterday.
///
/// `dates` may be unordered and may repeat.
pub fn current_streak_from(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days = distinct_days_descending(dates);
    let Some(&most_recent) = days.first() else {
        return 0;
    };
    if days_between(today, most_recent) > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in days.windows(2) {
        if days_between(pair[0], pair[1]) == 1 {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

fn distinct_days_descending(dates: &[NaiveDate]) -> Vec<NaiveDate> {
    let mut days = dates.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    days
}

/// Recomputes and stores a user's current and maximum streak.
#[derive(Clone)]
pub struct StreakEngine {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
    calendar: Calendar,
}

impl StreakEngine {
    pub fn new(db: Arc<dyn DatabaseService>, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        Self { db, clock, calendar }
    }

    pub async fn update_streak(&self, user_id: Uuid) -> PortResult<StreakSummary> {
        let dates = self.db.list_study_dates(user_id).await?;
        let user = self.db.get_user(user_id).await?;
        let most_recent = dates.iter().copied().max();

        let current_streak = match most_recent {
            Some(_) => current_streak_from(&dates, self.calendar.today(self.clock.as_ref())),
            None => 0,
        };
        let max_streak = current_streak.max(user.max_streak);

        self.db
            .update_user_streak(user_id, current_streak, max_streak, most_recent)
            .await?;

        debug!(%user_id, current_streak, max_streak, "Streak recomputed");
        Ok(StreakSummary {
            current_streak,
            max_streak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudyLogFields;
    use crate::memory::InMemoryDatabase;
    use crate::time::FixedClock;
    use chrono::{Duration, TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn days_ago(n: i64) -> NaiveDate {
        today() - Duration::days(n)
    }

    #[test]
    fn consecutive_run_ending_today() {
        // Logs 2 days ago, yesterday and today.
        assert_eq!(current_streak_from(&[days_ago(2), days_ago(1), today()], today()), 3);
    }

    #[test]
    fn gap_stops_the_walk() {
        assert_eq!(current_streak_from(&[days_ago(3), today()], today()), 1);
        // Studied today and yesterday but skipped the day before.
        assert_eq!(
            current_streak_from(&[today(), days_ago(1), days_ago(3), days_ago(4)], today()),
            2
        );
    }

    #[test]
    fn stale_most_recent_date_breaks_the_streak() {
        assert_eq!(current_streak_from(&[days_ago(2), days_ago(3)], today()), 0);
    }

    #[test]
    fn run_ending_yesterday_still_counts() {
        assert_eq!(current_streak_from(&[days_ago(1), days_ago(2)], today()), 2);
    }

    #[test]
    fn duplicates_and_order_do_not_matter() {
        let dates = [today(), days_ago(1), today(), days_ago(1), days_ago(2)];
        assert_eq!(current_streak_from(&dates, today()), 3);
        assert_eq!(current_streak_from(&[], today()), 0);
    }

    #[test]
    fn older_dates_behind_a_gap_are_ignored() {
        let base = [today(), days_ago(1)];
        let with_old = [today(), days_ago(1), days_ago(10), days_ago(11), days_ago(12)];
        assert_eq!(
            current_streak_from(&base, today()),
            current_streak_from(&with_old, today())
        );
    }

    fn engine_at(db: Arc<InMemoryDatabase>) -> StreakEngine {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap());
        StreakEngine::new(db, Arc::new(clock), Calendar::utc())
    }

    fn fields(date: NaiveDate) -> StudyLogFields {
        StudyLogFields {
            study_date: date,
            content: "reading".into(),
            duration_minutes: 30,
            reflection: None,
        }
    }

    #[tokio::test]
    async fn update_streak_persists_all_three_fields() {
        let db = Arc::new(InMemoryDatabase::new());
        let user = db.get_or_create_user_by_email("a@example.com").await.unwrap();
        for date in [days_ago(2), days_ago(1), today()] {
            db.insert_study_log(user.id, fields(date)).await.unwrap();
        }

        let summary = engine_at(db.clone()).update_streak(user.id).await.unwrap();
        assert_eq!(summary, StreakSummary { current_streak: 3, max_streak: 3 });

        let stored = db.get_user(user.id).await.unwrap();
        assert_eq!(stored.current_streak, 3);
        assert_eq!(stored.max_streak, 3);
        assert_eq!(stored.last_study_date, Some(today()));
    }

    #[tokio::test]
    async fn max_streak_never_decreases() {
        let db = Arc::new(InMemoryDatabase::new());
        let user = db.get_or_create_user_by_email("b@example.com").await.unwrap();
        db.update_user_streak(user.id, 0, 12, None).await.unwrap();
        db.insert_study_log(user.id, fields(days_ago(5))).await.unwrap();

        let summary = engine_at(db.clone()).update_streak(user.id).await.unwrap();
        assert_eq!(summary, StreakSummary { current_streak: 0, max_streak: 12 });
        assert_eq!(db.get_user(user.id).await.unwrap().last_study_date, Some(days_ago(5)));
    }

    #[tokio::test]
    async fn no_logs_resets_current_and_keeps_max() {
        let db = Arc::new(InMemoryDatabase::new());
        let user = db.get_or_create_user_by_email("c@example.com").await.unwrap();
        db.update_user_streak(user.id, 4, 9, Some(today())).await.unwrap();

        let summary = engine_at(db.clone()).update_streak(user.id).await.unwrap();
        assert_eq!(summary, StreakSummary { current_streak: 0, max_streak: 9 });

        let stored = db.get_user(user.id).await.unwrap();
        assert_eq!(stored.last_study_date, None);
        assert_eq!(stored.max_streak, 9);
    }
}
