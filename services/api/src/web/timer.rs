//! services/api/src/web/timer.rs
//!
//! Server-held focus timer. Every request first advances the user's timer
//! to "now"; a focus phase that ran out is recorded as a pomodoro, stamped
//! with the moment it ran out, and the timer moves on to its break.

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{PomodoroDuration, PomodoroTimer, TimerError, TimerPhase};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::action::{ok, ActionFailure, ActionResult};
use crate::web::extract::ValidJson;
use crate::web::middleware::CurrentUser;
use crate::web::pomodoro::{record_pomodoro, PomodoroSessionResponse};
use crate::web::state::{AppState, TimerSlot};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Focus,
    Break,
}

#[derive(Deserialize, ToSchema)]
pub struct SwitchPhaseRequest {
    pub phase: PhaseName,
}

#[derive(Serialize, ToSchema)]
pub struct TimerResponse {
    pub phase: String,
    pub state: String,
    pub remaining_seconds: i64,
    /// `MM:SS`
    pub display: String,
    /// The phase that ran out since the last request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_phase: Option<String>,
    /// The pomodoro recorded for a finished focus phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_pomodoro: Option<PomodoroSessionResponse>,
}

/// Advances the timer, records a finished focus phase, then applies `action`.
async fn drive(
    state: &AppState,
    user_id: Uuid,
    action: impl FnOnce(&mut PomodoroTimer) -> Result<(), TimerError>,
) -> ActionResult<TimerResponse> {
    let slot = state.timers.slot(user_id);
    let response = advance(state, user_id, &slot, action).await;
    drop(slot);
    state.timers.release(user_id);
    response
}

async fn advance(
    state: &AppState,
    user_id: Uuid,
    slot: &TimerSlot,
    action: impl FnOnce(&mut PomodoroTimer) -> Result<(), TimerError>,
) -> ActionResult<TimerResponse> {
    let mut timer = slot.lock().await;
    let now = state.clock.now();
    let completed = timer.tick(now);

    // The phase only moves on once the pomodoro is stored. On failure the
    // timer stays completed and the next request records it again.
    let recorded = match completed {
        Some(done) if done.phase == TimerPhase::Focus => {
            let duration = PomodoroDuration::new(done.minutes()).map_err(ActionFailure::validation)?;
            Some(record_pomodoro(state, user_id, duration, done.finished_at).await?)
        }
        Some(done) => {
            debug!(%user_id, phase = done.phase.as_str(), "Timer phase finished");
            None
        }
        None => None,
    };
    if let Some(done) = completed {
        timer.switch_phase(done.phase.next());
    }

    action(&mut *timer).map_err(|e| ActionFailure::conflict(e.to_string()))?;

    ok(TimerResponse {
        phase: timer.phase().as_str().to_string(),
        state: timer.state().as_str().to_string(),
        remaining_seconds: timer.remaining(now).num_seconds(),
        display: timer.display(now),
        completed_phase: completed.map(|c| c.phase.as_str().to_string()),
        recorded_pomodoro: recorded.map(Into::into),
    })
}

/// GET /timer - Current timer state
#[utoipa::path(
    get,
    path = "/timer",
    responses(
        (status = 200, description = "Timer state", body = TimerResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_timer_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<TimerResponse> {
    drive(&state, user_id, |_| Ok(())).await
}

/// POST /timer/start - Start or resume the current phase
#[utoipa::path(
    post,
    path = "/timer/start",
    responses(
        (status = 200, description = "Timer running", body = TimerResponse),
        (status = 409, description = "Timer already running", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn start_timer_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<TimerResponse> {
    let now = state.clock.now();
    drive(&state, user_id, |timer| timer.start(now)).await
}

/// POST /timer/pause - Pause a running timer
#[utoipa::path(
    post,
    path = "/timer/pause",
    responses(
        (status = 200, description = "Timer paused", body = TimerResponse),
        (status = 409, description = "Timer not running", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn pause_timer_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<TimerResponse> {
    let now = state.clock.now();
    drive(&state, user_id, |timer| timer.pause(now)).await
}

/// POST /timer/reset - Back to the full length of the current phase
#[utoipa::path(
    post,
    path = "/timer/reset",
    responses(
        (status = 200, description = "Timer reset", body = TimerResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn reset_timer_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<TimerResponse> {
    drive(&state, user_id, |timer| {
        timer.reset();
        Ok(())
    })
    .await
}

/// POST /timer/phase - Switch between focus and break
#[utoipa::path(
    post,
    path = "/timer/phase",
    request_body = SwitchPhaseRequest,
    responses(
        (status = 200, description = "Phase switched, timer idle", body = TimerResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn switch_phase_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidJson(req): ValidJson<SwitchPhaseRequest>,
) -> ActionResult<TimerResponse> {
    let phase = match req.phase {
        PhaseName::Focus => TimerPhase::Focus,
        PhaseName::Break => TimerPhase::Break,
    };
    drive(&state, user_id, |timer| {
        timer.switch_phase(phase);
        Ok(())
    })
    .await
}
