//! services/api/src/web/extract.rs
//!
//! Axum's extractors, with their rejections rendered in the result envelope
//! instead of as plain text.

use axum::extract::{
    rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts,
};

use crate::web::action::ActionFailure;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ActionFailure))]
pub struct ValidJson<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(ActionFailure))]
pub struct ValidForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ActionFailure))]
pub struct ValidQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ActionFailure))]
pub struct ValidPath<T>(pub T);

impl From<JsonRejection> for ActionFailure {
    fn from(rejection: JsonRejection) -> Self {
        Self::malformed(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ActionFailure {
    fn from(rejection: FormRejection) -> Self {
        Self::malformed(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ActionFailure {
    fn from(rejection: QueryRejection) -> Self {
        Self::malformed(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ActionFailure {
    fn from(rejection: PathRejection) -> Self {
        Self::malformed(rejection.status(), rejection.body_text())
    }
}
