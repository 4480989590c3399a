//! crates/study_tracker_core/src/error.rs
//!
//! The error type returned at the boundary of every core service.

use crate::ports::PortError;
use crate::validation::FieldErrors;

/// Failures a service operation can report to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input failed shape or range checks; never reaches the store.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// The target record does not exist or belongs to another user.
    #[error("Record not found or not owned by the acting user")]
    NotFoundOrUnauthorized,

    /// The store or another adapter failed unexpectedly.
    #[error("Infrastructure failure: {0}")]
    Infrastructure(#[from] PortError),
}

impl From<FieldErrors> for ServiceError {
    fn from(errors: FieldErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

/// A convenience type alias for `Result<T, ServiceError>`.
pub type ServiceResult<T> = Result<T, ServiceError>;
