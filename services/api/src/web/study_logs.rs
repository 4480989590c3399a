//! services/api/src/web/study_logs.rs
//!
//! CRUD endpoints for study logs. Every handler is scoped to the signed-in user.

use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{
    ListQuery, Page, StudyLog, StudyLogDetail, StudyLogForm, StudyLogInput, StudyLogSummary,
};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::action::{created, ok, ActionFailure, ActionResult};
use crate::web::extract::{ValidForm, ValidPath, ValidQuery};
use crate::web::middleware::CurrentUser;
use crate::web::pomodoro::PomodoroSessionResponse;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// The study log form as submitted. Fields arrive as raw text and are
/// validated together, so every problem is reported at once.
#[derive(Deserialize, ToSchema)]
pub struct StudyLogFormRequest {
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub study_date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub duration_minutes: String,
    #[serde(default)]
    pub reflection: Option<String>,
}

impl From<StudyLogFormRequest> for StudyLogForm {
    fn from(req: StudyLogFormRequest) -> Self {
        StudyLogForm {
            study_date: req.study_date,
            content: req.content,
            duration_minutes: req.duration_minutes,
            reflection: req.reflection,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListLogsParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct StudyLogResponse {
    pub id: Uuid,
    pub study_date: NaiveDate,
    pub content: String,
    pub duration_minutes: u32,
    pub reflection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StudyLog> for StudyLogResponse {
    fn from(log: StudyLog) -> Self {
        Self {
            id: log.id,
            study_date: log.study_date,
            content: log.content,
            duration_minutes: log.duration_minutes,
            reflection: log.reflection,
            created_at: log.created_at,
            updated_at: log.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudyLogDetailResponse {
    #[serde(flatten)]
    pub log: StudyLogResponse,
    pub pomodoro_sessions: Vec<PomodoroSessionResponse>,
}

impl From<StudyLogDetail> for StudyLogDetailResponse {
    fn from(detail: StudyLogDetail) -> Self {
        Self {
            log: detail.log.into(),
            pomodoro_sessions: detail.pomodoro_sessions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudyLogSummaryResponse {
    #[serde(flatten)]
    pub log: StudyLogResponse,
    pub pomodoro_count: u64,
}

impl From<StudyLogSummary> for StudyLogSummaryResponse {
    fn from(summary: StudyLogSummary) -> Self {
        Self {
            log: summary.log.into(),
            pomodoro_count: summary.pomodoro_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudyLogPageResponse {
    pub logs: Vec<StudyLogSummaryResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

impl From<Page<StudyLogSummary>> for StudyLogPageResponse {
    fn from(page: Page<StudyLogSummary>) -> Self {
        Self {
            logs: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DeletedResponse {
    pub id: Uuid,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /logs - Record a day of study
#[utoipa::path(
    post,
    path = "/logs",
    request_body(content = StudyLogFormRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Study log created", body = StudyLogResponse),
        (status = 400, description = "Validation failed", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error", body = crate::web::action::ActionErrorBody)
    )
)]
pub async fn create_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidForm(req): ValidForm<StudyLogFormRequest>,
) -> ActionResult<StudyLogResponse> {
    let input = StudyLogInput::parse(req.into()).map_err(ActionFailure::validation)?;
    let log = state
        .study_logs
        .create(user_id, input)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to create study log"))?;

    state.refresh_badges(user_id).await;
    created(log.into())
}

/// GET /logs - List study logs, newest first
#[utoipa::path(
    get,
    path = "/logs",
    params(ListLogsParams),
    responses(
        (status = 200, description = "One page of study logs", body = StudyLogPageResponse),
        (status = 400, description = "Invalid paging", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_logs_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidQuery(params): ValidQuery<ListLogsParams>,
) -> ActionResult<StudyLogPageResponse> {
    let query = ListQuery::new(params.page, params.page_size, params.start_date, params.end_date)
        .map_err(ActionFailure::validation)?;
    let page = state
        .study_logs
        .find_many(user_id, query)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to load study logs"))?;
    ok(page.into())
}

/// GET /logs/{id} - One study log with its pomodoro sessions
///
/// A log that does not exist or belongs to someone else yields `data: null`.
#[utoipa::path(
    get,
    path = "/logs/{id}",
    params(("id" = Uuid, Path, description = "Study log id")),
    responses(
        (status = 200, description = "The study log, or null", body = Option<StudyLogDetailResponse>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidPath(id): ValidPath<Uuid>,
) -> ActionResult<Option<StudyLogDetailResponse>> {
    let detail = state
        .study_logs
        .find_by_id(user_id, id)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to load study log"))?;
    ok(detail.map(Into::into))
}

/// PUT /logs/{id} - Replace the fields of a study log
#[utoipa::path(
    put,
    path = "/logs/{id}",
    params(("id" = Uuid, Path, description = "Study log id")),
    request_body(content = StudyLogFormRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Study log updated", body = StudyLogResponse),
        (status = 400, description = "Validation failed", body = crate::web::action::ActionErrorBody),
        (status = 404, description = "No such study log", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn update_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidPath(id): ValidPath<Uuid>,
    ValidForm(req): ValidForm<StudyLogFormRequest>,
) -> ActionResult<StudyLogResponse> {
    let input = StudyLogInput::parse(req.into()).map_err(ActionFailure::validation)?;
    let log = state
        .study_logs
        .update(user_id, id, input)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to update study log"))?;

    state.refresh_badges(user_id).await;
    ok(log.into())
}

/// DELETE /logs/{id} - Delete a study log
#[utoipa::path(
    delete,
    path = "/logs/{id}",
    params(("id" = Uuid, Path, description = "Study log id")),
    responses(
        (status = 200, description = "Study log deleted", body = DeletedResponse),
        (status = 404, description = "No such study log", body = crate::web::action::ActionErrorBody),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn delete_log_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ValidPath(id): ValidPath<Uuid>,
) -> ActionResult<DeletedResponse> {
    state
        .study_logs
        .delete(user_id, id)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to delete study log"))?;
    ok(DeletedResponse { id })
}
