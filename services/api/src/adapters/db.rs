//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use study_tracker_core::domain::{
    AuthSession, AwardedBadge, DateRange, PomodoroSession, StudyLog, StudyLogFields,
    StudyLogSummary, User, UserStats,
};
use study_tracker_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Counts are stored in INTEGER columns, which stop at `i32::MAX`.
fn to_column(value: u32) -> PortResult<i32> {
    i32::try_from(value)
        .map_err(|_| PortError::Unexpected(format!("{} does not fit an INTEGER column", value)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "id, email, current_streak, max_streak, last_study_date, created_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: Option<String>,
    current_streak: i32,
    max_streak: i32,
    last_study_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            current_streak: to_u32(self.current_streak),
            max_streak: to_u32(self.max_streak),
            last_study_date: self.last_study_date,
            created_at: self.created_at,
        }
    }
}

const STUDY_LOG_COLUMNS: &str =
    "id, user_id, study_date, content, duration_minutes, reflection, created_at, updated_at";

#[derive(FromRow)]
struct StudyLogRecord {
    id: Uuid,
    user_id: Uuid,
    study_date: NaiveDate,
    content: String,
    duration_minutes: i32,
    reflection: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl StudyLogRecord {
    fn to_domain(self) -> StudyLog {
        StudyLog {
            id: self.id,
            user_id: self.user_id,
            study_date: self.study_date,
            content: self.content,
            duration_minutes: to_u32(self.duration_minutes),
            reflection: self.reflection,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct StudyLogSummaryRecord {
    #[sqlx(flatten)]
    log: StudyLogRecord,
    pomodoro_count: i64,
}
impl StudyLogSummaryRecord {
    fn to_domain(self) -> StudyLogSummary {
        StudyLogSummary {
            log: self.log.to_domain(),
            pomodoro_count: to_u64(self.pomodoro_count),
        }
    }
}

const POMODORO_COLUMNS: &str = "id, user_id, study_log_id, duration_minutes, completed_at";

#[derive(FromRow)]
struct PomodoroRecord {
    id: Uuid,
    user_id: Uuid,
    study_log_id: Option<Uuid>,
    duration_minutes: i32,
    completed_at: DateTime<Utc>,
}
impl PomodoroRecord {
    fn to_domain(self) -> PomodoroSession {
        PomodoroSession {
            id: self.id,
            user_id: self.user_id,
            study_log_id: self.study_log_id,
            duration_minutes: to_u32(self.duration_minutes),
            completed_at: self.completed_at,
        }
    }
}

#[derive(FromRow)]
struct UserStatsRecord {
    study_log_count: i64,
    pomodoro_count: i64,
    total_study_minutes: i64,
    max_streak: i32,
}

#[derive(FromRow)]
struct BadgeRecord {
    user_id: Uuid,
    badge_id: String,
    awarded_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn get_or_create_user_by_email(&self, email: &str) -> PortResult<User> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (id, email) VALUES ($1, $2) \
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn update_user_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        max_streak: u32,
        last_study_date: Option<NaiveDate>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET current_streak = $2, max_streak = $3, last_study_date = $4 WHERE id = $1",
        )
        .bind(user_id)
        .bind(to_column(current_streak)?)
        .bind(to_column(max_streak)?)
        .bind(last_study_date)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    async fn insert_study_log(&self, user_id: Uuid, fields: StudyLogFields) -> PortResult<StudyLog> {
        let record = sqlx::query_as::<_, StudyLogRecord>(&format!(
            "INSERT INTO study_logs (id, user_id, study_date, content, duration_minutes, reflection) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {STUDY_LOG_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(fields.study_date)
        .bind(fields.content)
        .bind(to_column(fields.duration_minutes)?)
        .bind(fields.reflection)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn find_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<Option<StudyLog>> {
        let record = sqlx::query_as::<_, StudyLogRecord>(&format!(
            "SELECT {STUDY_LOG_COLUMNS} FROM study_logs WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(StudyLogRecord::to_domain))
    }

    async fn update_study_log(
        &self,
        user_id: Uuid,
        id: Uuid,
        fields: StudyLogFields,
    ) -> PortResult<Option<StudyLog>> {
        let record = sqlx::query_as::<_, StudyLogRecord>(&format!(
            "UPDATE study_logs \
             SET study_date = $3, content = $4, duration_minutes = $5, reflection = $6, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {STUDY_LOG_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(fields.study_date)
        .bind(fields.content)
        .bind(to_column(fields.duration_minutes)?)
        .bind(fields.reflection)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(StudyLogRecord::to_domain))
    }

    async fn delete_study_log(&self, user_id: Uuid, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM study_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_study_dates(&self, user_id: Uuid) -> PortResult<Vec<NaiveDate>> {
        sqlx::query_scalar::<_, NaiveDate>("SELECT study_date FROM study_logs WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn find_study_logs(
        &self,
        user_id: Uuid,
        range: DateRange,
        offset: u64,
        limit: u64,
    ) -> PortResult<Vec<StudyLogSummary>> {
        let records = sqlx::query_as::<_, StudyLogSummaryRecord>(
            "SELECT l.id, l.user_id, l.study_date, l.content, l.duration_minutes, l.reflection, \
                    l.created_at, l.updated_at, \
                    (SELECT COUNT(*) FROM pomodoro_sessions p WHERE p.study_log_id = l.id) AS pomodoro_count \
             FROM study_logs l \
             WHERE l.user_id = $1 \
               AND ($2::date IS NULL OR l.study_date >= $2) \
               AND ($3::date IS NULL OR l.study_date <= $3) \
             ORDER BY l.study_date DESC, l.created_at ASC \
             LIMIT $4 OFFSET $5",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_study_logs(&self, user_id: Uuid, range: DateRange) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM study_logs \
             WHERE user_id = $1 \
               AND ($2::date IS NULL OR study_date >= $2) \
               AND ($3::date IS NULL OR study_date <= $3)",
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(to_u64(count))
    }

    async fn find_first_study_log_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> PortResult<Option<StudyLog>> {
        let record = sqlx::query_as::<_, StudyLogRecord>(&format!(
            "SELECT {STUDY_LOG_COLUMNS} FROM study_logs \
             WHERE user_id = $1 AND study_date = $2 \
             ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(StudyLogRecord::to_domain))
    }

    async fn add_study_log_minutes(&self, id: Uuid, minutes: u32) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE study_logs SET duration_minutes = duration_minutes + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(to_column(minutes)?)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Study log {} not found", id)));
        }
        Ok(())
    }

    async fn insert_pomodoro_session(
        &self,
        user_id: Uuid,
        study_log_id: Option<Uuid>,
        duration_minutes: u32,
        completed_at: DateTime<Utc>,
    ) -> PortResult<PomodoroSession> {
        let record = sqlx::query_as::<_, PomodoroRecord>(&format!(
            "INSERT INTO pomodoro_sessions (id, user_id, study_log_id, duration_minutes, completed_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {POMODORO_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(study_log_id)
        .bind(to_column(duration_minutes)?)
        .bind(completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.to_domain())
    }

    async fn count_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM pomodoro_sessions \
             WHERE user_id = $1 AND completed_at >= $2 AND completed_at < $3",
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(to_u64(count))
    }

    async fn list_pomodoro_sessions_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PortResult<Vec<PomodoroSession>> {
        let records = sqlx::query_as::<_, PomodoroRecord>(&format!(
            "SELECT {POMODORO_COLUMNS} FROM pomodoro_sessions \
             WHERE user_id = $1 AND completed_at >= $2 AND completed_at < $3 \
             ORDER BY completed_at DESC"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_pomodoro_sessions_for_log(&self, study_log_id: Uuid) -> PortResult<Vec<PomodoroSession>> {
        let records = sqlx::query_as::<_, PomodoroRecord>(&format!(
            "SELECT {POMODORO_COLUMNS} FROM pomodoro_sessions \
             WHERE study_log_id = $1 ORDER BY completed_at ASC"
        ))
        .bind(study_log_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let record = sqlx::query_as::<_, UserStatsRecord>(
            "SELECT \
                (SELECT COUNT(*) FROM study_logs WHERE user_id = u.id) AS study_log_count, \
                (SELECT COUNT(*) FROM pomodoro_sessions WHERE user_id = u.id) AS pomodoro_count, \
                (SELECT COALESCE(SUM(duration_minutes), 0)::BIGINT FROM study_logs WHERE user_id = u.id) \
                    AS total_study_minutes, \
                u.max_streak \
             FROM users u WHERE u.id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(UserStats {
            study_log_count: to_u64(record.study_log_count),
            pomodoro_count: to_u64(record.pomodoro_count),
            total_study_minutes: to_u64(record.total_study_minutes),
            max_streak: to_u32(record.max_streak),
        })
    }

    async fn list_awarded_badges(&self, user_id: Uuid) -> PortResult<Vec<AwardedBadge>> {
        let records = sqlx::query_as::<_, BadgeRecord>(
            "SELECT user_id, badge_id, awarded_at FROM user_badges WHERE user_id = $1 ORDER BY awarded_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records
            .into_iter()
            .map(|r| AwardedBadge {
                user_id: r.user_id,
                badge_id: r.badge_id,
                awarded_at: r.awarded_at,
            })
            .collect())
    }

    async fn award_badge(
        &self,
        user_id: Uuid,
        badge_id: &str,
        awarded_at: DateTime<Utc>,
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id, awarded_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge_id)
        .bind(awarded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_magic_link(
        &self,
        token: &str,
        email: &str,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO magic_links (token, email, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(email)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn consume_magic_link(&self, token: &str, now: DateTime<Utc>) -> PortResult<String> {
        // Single statement, so two concurrent verifications cannot both win.
        let email = sqlx::query_scalar::<_, String>(
            "UPDATE magic_links SET consumed_at = $2 \
             WHERE token = $1 AND consumed_at IS NULL AND expires_at > $2 \
             RETURNING email",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        email.ok_or(PortError::Unauthorized)
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, expires_at",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(AuthSession {
            id: record.id,
            user_id: record.user_id,
            expires_at: record.expires_at,
        })
    }

    async fn validate_auth_session(&self, session_id: &str, now: DateTime<Utc>) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(session_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn purge_expired_auth(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let links = sqlx::query(
            "DELETE FROM magic_links WHERE expires_at <= $1 OR consumed_at IS NOT NULL",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let sessions = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(links.rows_affected() + sessions.rows_affected())
    }
}
