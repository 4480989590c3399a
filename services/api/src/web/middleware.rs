//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use study_tracker_core::PortError;
use uuid::Uuid;

use crate::web::action::ActionFailure;
use crate::web::auth::session_id_from;
use crate::web::state::AppState;

/// The signed-in user, placed in request extensions by [`require_auth`].
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

/// Middleware that validates the auth session cookie and extracts the user_id.
///
/// If valid, inserts a [`CurrentUser`] into request extensions for handlers to use.
/// If invalid, expired or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // Owned, so no borrow of the request is held across the await below.
    let Some(session_id) = session_id_from(req.headers()).map(str::to_owned) else {
        return ActionFailure::unauthorized("Please sign in").into_response();
    };

    let user_id = match state.auth.authenticate(&session_id).await {
        Ok(user_id) => user_id,
        Err(PortError::NotFound(_) | PortError::Unauthorized) => {
            return ActionFailure::unauthorized("Your session has expired, please sign in again")
                .into_response();
        }
        Err(e) => return ActionFailure::internal("Failed to validate session", &e).into_response(),
    };

    req.extensions_mut().insert(CurrentUser(user_id));
    next.run(req).await
}
