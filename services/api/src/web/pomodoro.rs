//! services/api/src/web/pomodoro.rs
//!
//! Recording finished pomodoros and reading back today's.

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{PomodoroDuration, PomodoroSession, TodaySummary};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::action::{created, ok, ActionFailure, ActionResult};
use crate::web::extract::ValidJson;
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct CompletePomodoroRequest {
    pub duration_minutes: u32,
}

#[derive(Serialize, ToSchema)]
pub struct PomodoroSessionResponse {
    pub id: Uuid,
    pub study_log_id: Option<Uuid>,
    pub duration_minutes: u32,
    pub completed_at: DateTime<Utc>,
}

impl From<PomodoroSession> for PomodoroSessionResponse {
    fn from(session: PomodoroSession) -> Self {
        Self {
            id: session.id,
            study_log_id: session.study_log_id,
            duration_minutes: session.duration_minutes,
            completed_at: session.completed_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TodayPomodorosResponse {
    pub count: u64,
    pub sessions: Vec<PomodoroSessionResponse>,
}

impl From<TodaySummary> for TodayPomodorosResponse {
    fn from(summary: TodaySummary) -> Self {
        Self {
            count: summary.count,
            sessions: summary.sessions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Records a pomodoro that finished at `completed_at` and refreshes badges.
/// Shared with the focus timer.
pub async fn record_pomodoro(
    state: &AppState,
    user_id: Uuid,
    duration: PomodoroDuration,
    completed_at: DateTime<Utc>,
) -> Result<PomodoroSession, ActionFailure> {
    let session = state
        .pomodoros
        .complete_pomodoro_at(user_id, duration, completed_at)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to record pomodoro"))?;
    state.refresh_badges(user_id).await;
    Ok(session)
}

/// POST /pomodoros - Record a finished pomodoro
#[utoipa::path(
    post,
    path = "/pomodoros",
    request_body = CompletePomodoroRequest,
    responses(
        (status = 201, description = "Pomodoro recorded", body = PomodoroSessionResponse),
        (status = 400, description = "Invalid duration", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error", body = crate::web::action::ActionErrorBody)
    )
)]
pub async fn complete_pomodoro_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidJson(req): ValidJson<CompletePomodoroRequest>,
) -> ActionResult<PomodoroSessionResponse> {
    let duration = PomodoroDuration::new(req.duration_minutes).map_err(ActionFailure::validation)?;
    let session = record_pomodoro(&state, user_id, duration, state.clock.now()).await?;
    created(session.into())
}

/// GET /pomodoros/today - Today's pomodoro count and sessions
#[utoipa::path(
    get,
    path = "/pomodoros/today",
    responses(
        (status = 200, description = "Today's pomodoros, newest first", body = TodayPomodorosResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn todays_pomodoros_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<TodayPomodorosResponse> {
    let summary = state
        .pomodoros
        .todays_summary(user_id)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to load today's pomodoros"))?;
    ok(summary.into())
}
