//! Error taxonomy for the scheduling engine.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::BookingStatus;

/// Broad error classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unresolvable input; never retried
    Validation,
    /// The request collides with existing state ("pick another time")
    Conflict,
    /// The entity does not exist within the requesting shop
    NotFound,
    /// Storage failure or unexpected state
    Internal,
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("invalid time format: {0:?} (expected HH:mm)")]
    InvalidFormat(String),

    #[error("appointment starting at {start} for {duration} minutes would cross midnight")]
    CrossesMidnight { start: String, duration: u32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("a staff member must be selected for this booking")]
    StaffRequired,

    #[error("staff member is unavailable: {0}")]
    StaffUnavailable(String),

    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("booking is {0} and can no longer be rescheduled")]
    BookingClosed(BookingStatus),

    #[error("booking was modified concurrently, reload and retry")]
    ConcurrentModification,

    #[error("{0} not found")]
    NotFound(String),

    #[error("booking code already in use")]
    BookingCodeTaken,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulingError::InvalidFormat(_)
            | SchedulingError::CrossesMidnight { .. }
            | SchedulingError::Validation(_)
            | SchedulingError::ServiceNotFound(_)
            | SchedulingError::StaffRequired => ErrorKind::Validation,
            SchedulingError::StaffUnavailable(_)
            | SchedulingError::InvalidTransition { .. }
            | SchedulingError::BookingClosed(_)
            | SchedulingError::ConcurrentModification => ErrorKind::Conflict,
            SchedulingError::NotFound(_) => ErrorKind::NotFound,
            SchedulingError::BookingCodeTaken
            | SchedulingError::Database(_)
            | SchedulingError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine-readable name of the constraint that failed
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::InvalidFormat(_) => "invalid_format",
            SchedulingError::CrossesMidnight { .. } => "crosses_midnight",
            SchedulingError::Validation(_) => "validation_error",
            SchedulingError::ServiceNotFound(_) => "service_not_found",
            SchedulingError::StaffRequired => "staff_required",
            SchedulingError::StaffUnavailable(_) => "staff_unavailable",
            SchedulingError::InvalidTransition { .. } => "invalid_transition",
            SchedulingError::BookingClosed(_) => "booking_closed",
            SchedulingError::ConcurrentModification => "concurrent_modification",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::BookingCodeTaken
            | SchedulingError::Database(_)
            | SchedulingError::Internal(_) => "internal_error",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        SchedulingError::NotFound(what.into())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: code.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for SchedulingError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if self.kind() == ErrorKind::Internal {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse::new(self.code(), message))).into_response()
    }
}

pub type Result<T, E = SchedulingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SchedulingError::ServiceNotFound("svc".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SchedulingError::StaffUnavailable("busy".into()).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            SchedulingError::not_found("booking").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(SchedulingError::BookingCodeTaken.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let response = SchedulingError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = SchedulingError::StaffRequired.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
