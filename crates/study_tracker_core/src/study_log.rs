//! crates/study_tracker_core/src/study_log.rs
//!
//! Create, update, delete and list operations for study logs. Every
//! operation is scoped to the acting user, and every mutation that can
//! change the user's set of study dates re-runs the streak engine.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Page, StudyLog, StudyLogDetail, StudyLogSummary};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::DatabaseService;
use crate::streak::StreakEngine;
use crate::validation::{ListQuery, StudyLogInput};

#[derive(Clone)]
pub struct StudyLogService {
    db: Arc<dyn DatabaseService>,
    streak: StreakEngine,
}

impl StudyLogService {
    pub fn new(db: Arc<dyn DatabaseService>, streak: StreakEngine) -> Self {
        Self { db, streak }
    }

    pub async fn create(&self, user_id: Uuid, input: StudyLogInput) -> ServiceResult<StudyLog> {
        let log = self.db.insert_study_log(user_id, input.into_fields()).await?;
        self.streak.update_streak(user_id).await?;
        info!(%user_id, log_id = %log.id, study_date = %log.study_date, "Study log created");
        Ok(log)
    }

    /// Overwrites every field of a log the user owns.
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: StudyLogInput,
    ) -> ServiceResult<StudyLog> {
        let log = self
            .db
            .update_study_log(user_id, id, input.into_fields())
            .await?
            .ok_or(ServiceError::NotFoundOrUnauthorized)?;
        self.streak.update_streak(user_id).await?;
        info!(%user_id, log_id = %id, "Study log updated");
        Ok(log)
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> ServiceResult<()> {
        if !self.db.delete_study_log(user_id, id).await? {
            return Err(ServiceError::NotFoundOrUnauthorized);
        }
        self.streak.update_streak(user_id).await?;
        info!(%user_id, log_id = %id, "Study log deleted");
        Ok(())
    }

    /// The log with its pomodoro sessions, or `None` if the user does not own it.
    pub async fn find_by_id(&self, user_id: Uuid, id: Uuid) -> ServiceResult<Option<StudyLogDetail>> {
        let Some(log) = self.db.find_study_log(user_id, id).await? else {
            return Ok(None);
        };
        let pomodoro_sessions = self.db.list_pomodoro_sessions_for_log(log.id).await?;
        Ok(Some(StudyLogDetail {
            log,
            pomodoro_sessions,
        }))
    }

    pub async fn find_many(
        &self,
        user_id: Uuid,
        query: ListQuery,
    ) -> ServiceResult<Page<StudyLogSummary>> {
        let range = query.range();
        let (items, total) = futures::try_join!(
            self.db.find_study_logs(
                user_id,
                range,
                query.offset(),
                u64::from(query.page_size())
            ),
            self.db.count_study_logs(user_id, range),
        )?;

        let has_more = total > u64::from(query.page()) * u64::from(query.page_size());
        debug!(%user_id, page = query.page(), total, "Study logs listed");
        Ok(Page {
            items,
            total,
            page: query.page(),
            page_size: query.page_size(),
            has_more,
        })
    }
}
