//! services/api/src/web/progress.rs
//!
//! Read-only views of a user's progress: streaks and badges.

use axum::{extract::State, Extension};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use study_tracker_core::BadgeStatus;
use utoipa::ToSchema;

use crate::web::action::{ok, ActionFailure, ActionResult};
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct StreakResponse {
    pub current_streak: u32,
    pub max_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct BadgeResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub awarded: bool,
    pub awarded_at: Option<DateTime<Utc>>,
}

impl From<BadgeStatus> for BadgeResponse {
    fn from(status: BadgeStatus) -> Self {
        Self {
            id: status.badge.id.to_string(),
            name: status.badge.name.to_string(),
            description: status.badge.description.to_string(),
            category: status.badge.category.as_str().to_string(),
            awarded: status.awarded_at.is_some(),
            awarded_at: status.awarded_at,
        }
    }
}

/// GET /me/streak - The streak as of the last study log change
#[utoipa::path(
    get,
    path = "/me/streak",
    responses(
        (status = 200, description = "Current and best streak", body = StreakResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn streak_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<StreakResponse> {
    let user = state
        .db
        .get_user(user_id)
        .await
        .map_err(|e| ActionFailure::internal("Failed to load streak", &e))?;
    ok(StreakResponse {
        current_streak: user.current_streak,
        max_streak: user.max_streak,
        last_study_date: user.last_study_date,
    })
}

/// GET /badges - Every badge, with the ones this user holds marked
#[utoipa::path(
    get,
    path = "/badges",
    responses(
        (status = 200, description = "The badge catalog in display order", body = Vec<BadgeResponse>),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_badges_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ActionResult<Vec<BadgeResponse>> {
    let badges = state
        .badges
        .list(user_id)
        .await
        .map_err(|e| ActionFailure::from_service(e, "Failed to load badges"))?;
    ok(badges.into_iter().map(Into::into).collect())
}
