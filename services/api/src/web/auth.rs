//! services/api/src/web/auth.rs
//!
//! Passwordless sign-in: request a magic link, follow it, sign out.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_tracker_core::{EmailAddress, PortError};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppEnv;
use crate::web::action::{ok, ActionFailure, ActionResult};
use crate::web::extract::{ValidForm, ValidQuery};
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct MagicLinkRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct MagicLinkResponse {
    pub message: String,
    /// Only present in development, where no mail is actually sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_magic_link: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyParams {
    #[serde(default)]
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Pulls the session id out of the `Cookie` header, if any.
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|id| !id.is_empty())
}

fn session_cookie(value: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, value, max_age_seconds
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/magic-link - Send a sign-in link to an email address
#[utoipa::path(
    post,
    path = "/auth/magic-link",
    request_body(content = MagicLinkRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Sign-in link sent", body = MagicLinkResponse),
        (status = 400, description = "Invalid email address", body = crate::web::action::ActionErrorBody),
        (status = 500, description = "Internal server error", body = crate::web::action::ActionErrorBody)
    )
)]
pub async fn request_magic_link_handler(
    State(state): State<Arc<AppState>>,
    ValidForm(req): ValidForm<MagicLinkRequest>,
) -> ActionResult<MagicLinkResponse> {
    let email = EmailAddress::parse(&req.email).map_err(ActionFailure::validation)?;

    let issued = state
        .auth
        .request_magic_link(&email)
        .await
        .map_err(|e| ActionFailure::internal("Failed to send the sign-in link", &e))?;

    // The link is tied to this response only, so concurrent requests never see each other's links.
    let dev_magic_link = (state.config.app_env == AppEnv::Development).then_some(issued.url);

    ok(MagicLinkResponse {
        message: format!("Check {} for your sign-in link", issued.email),
        dev_magic_link,
    })
}

/// GET /auth/verify - Exchange a magic link token for a session cookie
#[utoipa::path(
    get,
    path = "/auth/verify",
    params(("token" = String, Query, description = "Token from the sign-in link")),
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid, used or expired link", body = crate::web::action::ActionErrorBody),
        (status = 500, description = "Internal server error", body = crate::web::action::ActionErrorBody)
    )
)]
pub async fn verify_magic_link_handler(
    State(state): State<Arc<AppState>>,
    ValidQuery(params): ValidQuery<VerifyParams>,
) -> Result<impl IntoResponse, ActionFailure> {
    let session = state
        .auth
        .verify_magic_link(&params.token)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) | PortError::Unauthorized => {
                ActionFailure::unauthorized("This sign-in link is invalid or has expired")
            }
            other => ActionFailure::internal("Failed to sign in", &other),
        })?;

    let cookie = session_cookie(&session.id, state.auth.session_ttl().num_seconds());
    let body = ok(AuthResponse {
        user_id: session.user_id,
        expires_at: session.expires_at,
    })?;

    Ok(([(header::SET_COOKIE, cookie)], body))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session", body = crate::web::action::ActionErrorBody)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ActionFailure> {
    let session_id =
        session_id_from(&headers).ok_or_else(|| ActionFailure::unauthorized("No session found"))?;

    state
        .auth
        .sign_out(session_id)
        .await
        .map_err(|e| ActionFailure::internal("Failed to logout", &e))?;

    Ok([(header::SET_COOKIE, session_cookie("", 0))])
}
