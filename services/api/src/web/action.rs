//! services/api/src/web/action.rs
//!
//! The uniform result envelope every protected handler answers with.
//!
//! Success is `{"success": true, "data": ...}`. Failure is
//! `{"success": false, "error": "...", "field_errors": {...}}`, where
//! `field_errors` only appears for validation failures and requests that
//! could not be read. Infrastructure failures are logged here and replaced
//! by a generic message, so store errors never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::collections::BTreeMap;
use study_tracker_core::{FieldErrors, ServiceError};
use tracing::error;
use utoipa::ToSchema;

/// The success half of the envelope.
#[derive(Serialize)]
pub struct ActionOk<T> {
    success: bool,
    data: T,
}

/// The failure half of the envelope.
#[derive(Serialize, ToSchema)]
pub struct ActionErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    field_errors: BTreeMap<String, Vec<String>>,
}

/// A failed action, ready to be rendered.
#[derive(Debug)]
pub struct ActionFailure {
    status: StatusCode,
    message: String,
    field_errors: BTreeMap<String, Vec<String>>,
}

pub type ActionResult<T> = Result<(StatusCode, Json<ActionOk<T>>), ActionFailure>;

pub fn ok<T: Serialize>(data: T) -> ActionResult<T> {
    respond(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> ActionResult<T> {
    respond(StatusCode::CREATED, data)
}

fn respond<T: Serialize>(status: StatusCode, data: T) -> ActionResult<T> {
    Ok((status, Json(ActionOk { success: true, data })))
}

impl ActionFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field_errors: BTreeMap::new(),
        }
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self {
            field_errors: errors.into_map(),
            ..Self::new(StatusCode::BAD_REQUEST, "Please check your input")
        }
    }

    /// A request that could not be extracted. Keeps the rejection's status
    /// and reports its detail under the `request` field.
    pub fn malformed(status: StatusCode, detail: String) -> Self {
        Self {
            field_errors: BTreeMap::from([("request".to_string(), vec![detail])]),
            ..Self::new(status, "The request could not be read")
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Logs `cause` and answers with `message` only.
    pub fn internal(message: impl Into<String>, cause: &dyn std::fmt::Debug) -> Self {
        let message = message.into();
        error!(?cause, "{}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Maps a service error, using `failure_message` for infrastructure failures.
    pub fn from_service(err: ServiceError, failure_message: &str) -> Self {
        match err {
            ServiceError::Validation(errors) => Self::validation(errors),
            ServiceError::NotFoundOrUnauthorized => Self::not_found("Study log not found"),
            ServiceError::Infrastructure(cause) => Self::internal(failure_message, &cause),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ActionFailure {
    fn into_response(self) -> Response {
        let body = ActionErrorBody {
            success: false,
            error: self.message,
            field_errors: self.field_errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_tracker_core::PortError;

    #[test]
    fn infrastructure_errors_hide_the_cause() {
        let failure = ActionFailure::from_service(
            ServiceError::Infrastructure(PortError::Unexpected("connection refused".into())),
            "Failed to create study log",
        );
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.message, "Failed to create study log");
    }

    #[test]
    fn validation_errors_carry_field_messages() {
        let mut errors = FieldErrors::new();
        errors.add("content", "Describe what you studied");
        let failure = ActionFailure::from_service(ServiceError::Validation(errors), "unused");
        assert_eq!(failure.status(), StatusCode::BAD_REQUEST);
        assert_eq!(failure.field_errors["content"], vec!["Describe what you studied"]);
    }

    #[test]
    fn malformed_requests_keep_their_status() {
        let failure = ActionFailure::malformed(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected request with `Content-Type: application/json`".into(),
        );
        assert_eq!(failure.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(failure.field_errors["request"].len(), 1);
    }

    #[test]
    fn ownership_failures_are_not_found() {
        let failure = ActionFailure::from_service(ServiceError::NotFoundOrUnauthorized, "unused");
        assert_eq!(failure.status(), StatusCode::NOT_FOUND);
    }
}
