//! crates/study_tracker_core/src/memory.rs
//!
//! An in-process implementation of the `DatabaseService` port. Backs unit
//! and integration tests, and local runs that do not need PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    AuthSession, AwardedBadge, DateRange, PomodoroSession, StudyLog, StudyLogFields,
    StudyLogSummary, User, UserStats,
};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::validation::MAX_STUDY_MINUTES;

#[derive(Debug, Clone)]
struct StoredLog {
    /// Insertion order; breaks ties between logs created in the same instant.
    seq: u64,
    log: StudyLog,
}

#[derive(Debug, Clone)]
struct StoredMagicLink {
    email: String,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

#[derive(Default)]
struct Tables {
    next_seq: u64,
    users: HashMap<Uuid, User>,
    study_logs: HashMap<Uuid, StoredLog>,
    pomodoro_sessions: Vec<PomodoroSession>,
    badges: Vec<AwardedBadge>,
    magic_links: HashMap<String, StoredMagicLink>,
    auth_sessions: HashMap<String, AuthSession>,
}

/// `DatabaseService` over a mutex-guarded set of tables.
#[derive(Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    /// When set, every mutating call fails with `PortError::Unexpected`.
    fail_writes: AtomicBool,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, to exercise error paths.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored magic links and auth sessions, in that order.
    pub fn auth_rows(&self) -> (usize, usize) {
        let tables = self.tables();
        (tables.magic_links.len(), tables.auth_sessions.len())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn writable(&self) -> PortResult<MutexGuard<'_, Tables>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("simulated write failure".to_string()));
        }
        Ok(self.tables())
    }
}

/// Minutes are held to the range of PostgreSQL's INTEGER, so both stores
/// reject the same values.
fn column_minutes(minutes: u64) -> PortResult<u32> {
    u32::try_from(minutes)
        .ok()
        .filter(|m| *m <= MAX_STUDY_MINUTES)
        .ok_or_else(|| PortError::Unexpected(format!("{} minutes is out of range", minutes)))
}

fn pomodoro_count_for(tables: &Tables, study_log_id: Uuid) -> u64 {
    tables
        .pomodoro_sessions
        .iter()
        .filter(|s| s.study_log_id == Some(study_log_id))
        .count() as u64
}

fn owned_in_range<'a>(
    tables: &'a Tables,
    user_id: Uuid,
    range: DateRange,
) -> impl Iterator<Item = &'a StoredLog> {
    tables
        .study_logs
        .values()
        .filter(move |s| s.log.user_id == user_id && range.contains(s.log.study_date))
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_or_create_user_by_email(&self, email: &str) -> PortResult<User> {
        let mut tables = self.writable()?;
        if let Some(user) = tables.users.values().find(|u| u.email.as_deref() == Some(email)) {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            current_streak: 0,
            max_streak: 0,
            last_study_date: None,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        max_streak: u32,
        last_study_date: Option<NaiveDate>,
    ) -> PortResult<()> {
        let mut tables = self.writable()?;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        user.current_streak = current_streak;
        user.max_streak = max_streak;
        user.last_study_date = last_study_date;
        Ok(())
    }

    async fn insert_study_log(&self, user_id: Uuid, fields: StudyLogFields) -> PortResult<StudyLog> {
        let mut tables = self.writable()?;
        let now = Utc::now();
        let log = StudyLog {
            id: Uuid::new_v4(),
            user_id,
            study_date: fields.study_date,
            content: fields.content,
            duration_minutes: column_minutes(fields.duration_minutes.into())?,
            reflection: fields.reflection,
            created_at: now,
            updated_at: now,
        };
        tables.next_seq += 1;
        let seq = tables.next_seq;
        tables.study_logs.insert(log.id, StoredLog { seq, log: log.clone() });
        Ok(log)
    }

    async fn find_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<Option<StudyLog>> {
        Ok(self
            .tables()
            .study_logs
            .get(&id)
            .filter(|s| s.log.user_id == user_id)
            .map(|s| s.log.clone()))
    }

    async fn update_study_log(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: StudyLogFields,
    ) -> PortResult<Option<StudyLog>> {
        let duration_minutes = column_minutes(fields.duration_minutes.into())?;
        let mut tables = self.writable()?;
        let Some(stored) = tables
            .study_logs
            .get_mut(&id)
            .filter(|s| s.log.user_id == user_id)
        else {
            return Ok(None);
        };
        stored.log.study_date = fields.study_date;
        stored.log.content = fields.content;
        stored.log.duration_minutes = duration_minutes;
        stored.log.reflection = fields.reflection;
        stored.log.updated_at = Utc::now();
        Ok(Some(stored.log.clone()))
    }

    async fn delete_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<bool> {
        let mut tables = self.writable()?;
        let owned = tables
            .study_logs
            .get(&id)
            .is_some_and(|s| s.log.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        tables.study_logs.remove(&id);
        for session in tables.pomodoro_sessions.iter_mut() {
            if session.study_log_id == Some(id) {
                session.study_log_id = None;
            }
        }
        Ok(true)
    }

    async fn list_study_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        let tables = self.tables();
        Ok(owned_in_range(&tables, user_id, DateRange::default())
            .map(|s| s.log.study_date)
            .collect())
    }

    async fn find_study_logs(
        &self,
        user_id: Uuid,
        range: DateRange,
        offset: u64,
        limit: u64,
    ) -> PortResult<Vec<StudyLogSummary>> {
        let tables = self.tables();
        let mut logs: Vec<&StoredLog> = owned_in_range(&tables, user_id, range).collect();
        logs.sort_by(|a, b| b.log.study_date.cmp(&a.log.study_date).then(a.seq.cmp(&b.seq)));
        Ok(logs
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|s| StudyLogSummary {
                log: s.log.clone(),
                pomodoro_count: pomodoro_count_for(&tables, s.log.id),
            })
            .collect())
    }

    async fn count_study_logs(&self, user_id: Uuid, range: DateRange) -> PortResult<u64> {
        let tables = self.tables();
        Ok(owned_in_range(&tables, user_id, range).count() as u64)
    }

    async fn find_first_study_log_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<StudyLog>> {
        let tables = self.tables();
        let range = DateRange {
            start: Some(date),
            end: Some(date),
        };
        Ok(owned_in_range(&tables, user_id, range)
            .min_by_key(|s| (s.log.created_at, s.seq))
            .map(|s| s.log.clone()))
    }

    async fn add_study_log_minutes(&self, id: Uuid, minutes: u32) -> PortResult<()> {
        let mut tables = self.writable()?;
        let stored = tables
            .study_logs
            .get_mut(&id)
            .ok_or_else(|| PortError::NotFound(format!("Study log {} not found", id)))?;
        stored.log.duration_minutes =
            column_minutes(u64::from(stored.log.duration_minutes) + u64::from(minutes))?;
        stored.log.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_pomodoro_session(
        &self,
        user_id: Uuid,
        study_log_id: Option<Uuid>,
        duration_minutes: u32,
        completed_at: DateTime<Utc>,
    ) -> PortResult<PomodoroSession> {
        let mut tables = self.writable()?;
        let session = PomodoroSession {
            id: Uuid::new_v4(),
            user_id,
            study_log_id,
            duration_minutes: column_minutes(duration_minutes.into())?,
            completed_at,
        };
        tables.pomodoro_sessions.push(session.clone());
        Ok(session)
    }

    async fn count_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        Ok(self
            .list_pomodoro_sessions_between(user_id, start, end)
            .await?
            .len() as u64)
    }

    async fn list_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<PomodoroSession>> {
        let tables = self.tables();
        let mut sessions: Vec<PomodoroSession> = tables
            .pomodoro_sessions
            .iter()
            .filter(|s| s.user_id == user_id && s.completed_at >= start && s.completed_at < end)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(sessions)
    }

    async fn list_pomodoro_sessions_for_log(&self, study_log_id: Uuid) -> PortResult<Vec<PomodoroSession>> {
        let tables = self.tables();
        let mut sessions: Vec<PomodoroSession> = tables
            .pomodoro_sessions
            .iter()
            .filter(|s| s.study_log_id == Some(study_log_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(sessions)
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let tables = self.tables();
        let user = tables
            .users
            .get(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        let logs: Vec<&StoredLog> = owned_in_range(&tables, user_id, DateRange::default()).collect();
        Ok(UserStats {
            study_log_count: logs.len() as u64,
            pomodoro_count: tables
                .pomodoro_sessions
                .iter()
                .filter(|s| s.user_id == user_id)
                .count() as u64,
            total_study_minutes: logs.iter().map(|s| u64::from(s.log.duration_minutes)).sum(),
            max_streak: user.max_streak,
        })
    }

    async fn list_awarded_badges(&self, user_id: Uuid) -> PortResult<Vec<AwardedBadge>> {
        Ok(self
            .tables()
            .badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        awarded_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let mut tables = self.writable()?;
        if tables
            .badges
            .iter()
            .any(|b| b.user_id == user_id && b.badge_id == badge_id)
        {
            return Ok(false);
        }
        tables.badges.push(AwardedBadge {
            user_id,
            badge_id: badge_id.to_string(),
            awarded_at,
        });
        Ok(true)
    }

    async fn create_magic_link(
        &self,
        token: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.writable()?.magic_links.insert(
            token.to_string(),
            StoredMagicLink {
                email: email.to_string(),
                expires_at,
                consumed: false,
            },
        );
        Ok(())
    }

    async fn consume_magic_link(&self, token: &str, now: DateTime<Utc>) -> PortResult<String> {
        let mut tables = self.writable()?;
        let link = tables
            .magic_links
            .get_mut(token)
            .filter(|l| !l.consumed && l.expires_at > now)
            .ok_or(PortError::Unauthorized)?;
        link.consumed = true;
        Ok(link.email.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession> {
        let session = AuthSession {
            id: session_id.to_string(),
            user_id,
            expires_at,
        };
        self.writable()?
            .auth_sessions
            .insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn validate_auth_session(&self, session_id: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        self.tables()
            .auth_sessions
            .get(session_id)
            .filter(|s| s.expires_at > now)
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.writable()?.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn purge_expired_auth(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut tables = self.writable()?;
        let before = tables.magic_links.len() + tables.auth_sessions.len();
        tables.magic_links.retain(|_, l| !l.consumed && l.expires_at > now);
        tables.auth_sessions.retain(|_, s| s.expires_at > now);
        let after = tables.magic_links.len() + tables.auth_sessions.len();
        Ok((before - after) as u64)
    }
}
