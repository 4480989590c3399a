//! services/api/src/web/rest.rs
//!
//! Assembles the REST router and holds the master definition for the
//! OpenAPI specification.

use crate::web::{
    action::ActionErrorBody,
    auth::{self, logout_handler, request_magic_link_handler, verify_magic_link_handler},
    middleware::require_auth,
    pomodoro::{self, complete_pomodoro_handler, todays_pomodoros_handler},
    progress::{self, list_badges_handler, streak_handler},
    state::AppState,
    study_logs::{
        self, create_log_handler, delete_log_handler, get_log_handler, list_logs_handler,
        update_log_handler,
    },
    timer::{
        self, get_timer_handler, pause_timer_handler, reset_timer_handler, start_timer_handler,
        switch_phase_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

/// Form posts are small; nothing legitimate comes close to this.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::request_magic_link_handler,
        auth::verify_magic_link_handler,
        auth::logout_handler,
        study_logs::create_log_handler,
        study_logs::list_logs_handler,
        study_logs::get_log_handler,
        study_logs::update_log_handler,
        study_logs::delete_log_handler,
        pomodoro::complete_pomodoro_handler,
        pomodoro::todays_pomodoros_handler,
        progress::streak_handler,
        progress::list_badges_handler,
        timer::get_timer_handler,
        timer::start_timer_handler,
        timer::pause_timer_handler,
        timer::reset_timer_handler,
        timer::switch_phase_handler,
    ),
    components(
        schemas(
            ActionErrorBody,
            auth::MagicLinkRequest,
            auth::MagicLinkResponse,
            auth::AuthResponse,
            study_logs::StudyLogFormRequest,
            study_logs::StudyLogResponse,
            study_logs::StudyLogDetailResponse,
            study_logs::StudyLogSummaryResponse,
            study_logs::StudyLogPageResponse,
            study_logs::DeletedResponse,
            pomodoro::CompletePomodoroRequest,
            pomodoro::PomodoroSessionResponse,
            pomodoro::TodayPomodorosResponse,
            progress::StreakResponse,
            progress::BadgeResponse,
            timer::SwitchPhaseRequest,
            timer::PhaseName,
            timer::TimerResponse,
        )
    ),
    tags(
        (name = "Study Tracker API", description = "Daily study logs, streaks, pomodoros and badges.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds every API route over `state`. Cross-cutting layers such as CORS
/// and request tracing are added by the binary.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/magic-link", post(request_magic_link_handler))
        .route("/auth/verify", get(verify_magic_link_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/logs", get(list_logs_handler).post(create_log_handler))
        .route(
            "/logs/{id}",
            get(get_log_handler)
                .put(update_log_handler)
                .delete(delete_log_handler),
        )
        .route("/pomodoros", post(complete_pomodoro_handler))
        .route("/pomodoros/today", get(todays_pomodoros_handler))
        .route("/me/streak", get(streak_handler))
        .route("/badges", get(list_badges_handler))
        .route("/timer", get(get_timer_handler))
        .route("/timer/start", post(start_timer_handler))
        .route("/timer/pause", post(pause_timer_handler))
        .route("/timer/reset", post(reset_timer_handler))
        .route("/timer/phase", post(switch_phase_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
