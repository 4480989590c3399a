//! crates/study_tracker_core/src/pomodoro.rs
//!
//! Records completed focus sessions and folds their minutes into the day's
//! study log when one already exists.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::domain::{PomodoroSession, TodaySummary};
use crate::error::ServiceResult;
use crate::ports::{Clock, DatabaseService};
use crate::time::Calendar;
use crate::validation::PomodoroDuration;

#[derive(Clone)]
pub struct PomodoroService {
    db: Arc<dyn DatabaseService>,
    clock: Arc<dyn Clock>,
    calendar: Calendar,
}

impl PomodoroService {
    pub fn new(db: Arc<dyn DatabaseService>, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        Self { db, clock, calendar }
    }

    /// Stores a pomodoro finished just now. If the user already logged study
    /// today, the session is linked to the earliest such log and its minutes
    /// are added to that log.
    pub async fn complete_pomodoro(
        &self,
        user_id: Uuid,
        duration: PomodoroDuration,
    ) -> ServiceResult<PomodoroSession> {
        self.complete_pomodoro_at(user_id, duration, self.clock.now()).await
    }

    /// Stores a pomodoro that finished at `completed_at`. The study log it
    /// joins is the one for the day `completed_at` falls on.
    pub async fn complete_pomodoro_at(
        &self,
        user_id: Uuid,
        duration: PomodoroDuration,
        completed_at: DateTime<Utc>,
    ) -> ServiceResult<PomodoroSession> {
        let day = self.calendar.date_of(completed_at);
        let minutes = duration.minutes();

        let days_log = self.db.find_first_study_log_on(user_id, day).await?;
        let session = self
            .db
            .insert_pomodoro_session(user_id, days_log.as_ref().map(|log| log.id), minutes, completed_at)
            .await?;

        if let Some(log) = days_log {
            self.db.add_study_log_minutes(log.id, minutes).await?;
            info!(%user_id, log_id = %log.id, %day, minutes, "Pomodoro folded into the day's study log");
        } else {
            info!(%user_id, %day, minutes, "Pomodoro recorded without a study log");
        }
        Ok(session)
    }

    pub async fn todays_pomodoro_count(&self, user_id: Uuid) -> ServiceResult<u64> {
        let (start, end) = self.todays_bounds();
        Ok(self.db.count_pomodoro_sessions_between(user_id, start, end).await?)
    }

    /// Today's sessions, newest first.
    pub async fn todays_pomodoro_sessions(&self, user_id: Uuid) -> ServiceResult<Vec<PomodoroSession>> {
        let (start, end) = self.todays_bounds();
        Ok(self.db.list_pomodoro_sessions_between(user_id, start, end).await?)
    }

    pub async fn todays_summary(&self, user_id: Uuid) -> ServiceResult<TodaySummary> {
        let (count, sessions) = futures::try_join!(
            self.todays_pomodoro_count(user_id),
            self.todays_pomodoro_sessions(user_id),
        )?;
        Ok(TodaySummary { count, sessions })
    }

    fn todays_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.calendar.day_bounds(self.calendar.today(self.clock.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StudyLogFields;
    use crate::memory::InMemoryDatabase;
    use crate::time::FixedClock;
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};

    struct Fixture {
        service: PomodoroService,
        db: Arc<InMemoryDatabase>,
        clock: Arc<FixedClock>,
        user_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(InMemoryDatabase::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 15, 10, 0, 0).unwrap(),
        ));
        let service = PomodoroService::new(db.clone(), clock.clone(), Calendar::utc());
        let user_id = db.get_or_create_user_by_email("p@example.com").await.unwrap().id;
        Fixture {
            service,
            db,
            clock,
            user_id,
        }
    }

    fn log_on(date: NaiveDate, minutes: u32) -> StudyLogFields {
        StudyLogFields {
            study_date: date,
            content: "Statistics".into(),
            duration_minutes: minutes,
            reflection: None,
        }
    }

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn minutes(n: u32) -> PomodoroDuration {
        PomodoroDuration::new(n).unwrap()
    }

    #[tokio::test]
    async fn folds_into_todays_log() {
        let f = fixture().await;
        let log = f.db.insert_study_log(f.user_id, log_on(june(15), 30)).await.unwrap();

        let session = f.service.complete_pomodoro(f.user_id, minutes(25)).await.unwrap();

        assert_eq!(session.study_log_id, Some(log.id));
        assert_eq!(session.duration_minutes, 25);
        let log = f.db.find_study_log(f.user_id, log.id).await.unwrap().unwrap();
        assert_eq!(log.duration_minutes, 55);
    }

    #[tokio::test]
    async fn without_a_log_today_nothing_else_changes() {
        let f = fixture().await;
        let yesterday = f.db.insert_study_log(f.user_id, log_on(june(14), 30)).await.unwrap();

        let session = f.service.complete_pomodoro(f.user_id, minutes(25)).await.unwrap();

        assert_eq!(session.study_log_id, None);
        let yesterday = f.db.find_study_log(f.user_id, yesterday.id).await.unwrap().unwrap();
        assert_eq!(yesterday.duration_minutes, 30);
        assert_eq!(f.db.count_study_logs(f.user_id, Default::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn late_completion_joins_the_day_it_finished_on() {
        let f = fixture().await;
        let yesterdays = f.db.insert_study_log(f.user_id, log_on(june(14), 30)).await.unwrap();
        let todays = f.db.insert_study_log(f.user_id, log_on(june(15), 30)).await.unwrap();
        let finished_at = Utc.with_ymd_and_hms(2025, 6, 14, 23, 50, 0).unwrap();

        let session = f
            .service
            .complete_pomodoro_at(f.user_id, minutes(25), finished_at)
            .await
            .unwrap();

        assert_eq!(session.completed_at, finished_at);
        assert_eq!(session.study_log_id, Some(yesterdays.id));
        let yesterdays = f.db.find_study_log(f.user_id, yesterdays.id).await.unwrap().unwrap();
        assert_eq!(yesterdays.duration_minutes, 55);
        let todays = f.db.find_study_log(f.user_id, todays.id).await.unwrap().unwrap();
        assert_eq!(todays.duration_minutes, 30);
        assert_eq!(f.service.todays_pomodoro_count(f.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_day_logs_resolve_to_the_earliest_created() {
        let f = fixture().await;
        let first = f.db.insert_study_log(f.user_id, log_on(june(15), 10)).await.unwrap();
        let second = f.db.insert_study_log(f.user_id, log_on(june(15), 10)).await.unwrap();

        let session = f.service.complete_pomodoro(f.user_id, minutes(25)).await.unwrap();

        assert_eq!(session.study_log_id, Some(first.id));
        let second = f.db.find_study_log(f.user_id, second.id).await.unwrap().unwrap();
        assert_eq!(second.duration_minutes, 10);
    }

    #[tokio::test]
    async fn todays_window_is_half_open() {
        let f = fixture().await;
        let start_of_today = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let last_instant = start_of_today + Duration::days(1) - Duration::milliseconds(1);

        for completed_at in [
            start_of_today - Duration::milliseconds(1),
            start_of_today,
            last_instant,
            start_of_today + Duration::days(1),
        ] {
            f.db.insert_pomodoro_session(f.user_id, None, 25, completed_at).await.unwrap();
        }

        assert_eq!(f.service.todays_pomodoro_count(f.user_id).await.unwrap(), 2);
        let sessions = f.service.todays_pomodoro_sessions(f.user_id).await.unwrap();
        let stamps: Vec<_> = sessions.iter().map(|s| s.completed_at).collect();
        assert_eq!(stamps, vec![last_instant, start_of_today]);
    }

    #[tokio::test]
    async fn summary_matches_the_individual_reads() {
        let f = fixture().await;
        f.service.complete_pomodoro(f.user_id, minutes(25)).await.unwrap();
        f.clock.advance(Duration::minutes(30));
        let latest = f.service.complete_pomodoro(f.user_id, minutes(25)).await.unwrap();

        let summary = f.service.todays_summary(f.user_id).await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.sessions[0].id, latest.id);

        f.clock.advance(Duration::days(1));
        assert_eq!(f.service.todays_pomodoro_count(f.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn today_follows_the_reference_timezone() {
        let db = Arc::new(InMemoryDatabase::new());
        // 16:00 UTC on the 14th is already the 15th at UTC+9.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 14, 16, 0, 0).unwrap(),
        ));
        let calendar = Calendar::new(FixedOffset::east_opt(9 * 3600).unwrap());
        let service = PomodoroService::new(db.clone(), clock, calendar);
        let user_id = db.get_or_create_user_by_email("tz@example.com").await.unwrap().id;
        let log = db.insert_study_log(user_id, log_on(june(15), 0)).await.unwrap();

        let session = service.complete_pomodoro(user_id, minutes(25)).await.unwrap();
        assert_eq!(session.study_log_id, Some(log.id));
    }
}
