//! Error types for the attendance core and their HTTP mapping.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::store::{ConflictKind, StoreError};

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "clock_out")]
    pub field: String,
    #[schema(example = "must be after clock-in")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Everything a core command or query can fail with.
///
/// All variants except `Storage` are expected outcomes reported back to the
/// caller. `Storage` is opaque and never retried here.
#[derive(Error, Debug)]
pub enum AttendanceError {
    #[error("Already clocked in today")]
    AlreadyClockedIn,

    #[error("A break can only start while working")]
    InvalidStateForBreakStart,

    #[error("No break in progress")]
    InvalidStateForBreakEnd,

    #[error("No open attendance to clock out of")]
    InvalidStateForClockOut,

    #[error("Proposal {0} has already been processed")]
    AlreadyProcessed(u64),

    #[error("A correction for {day} is already awaiting approval")]
    DuplicatePendingProposal { day: NaiveDate },

    /// The rows a proposal was written against have changed since: a
    /// `create` for a day that now has an attendance, or a break correction
    /// whose interval is gone.
    #[error("Proposal {0} no longer matches the stored attendance")]
    StaleProposal(u64),

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("Validation failed: {}", describe_fields(.0))]
    ValidationFailed(Vec<FieldError>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

/// Result type alias for AttendanceError
pub type AttendanceResult<T> = std::result::Result<T, AttendanceError>;

fn describe_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl AttendanceError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::AlreadyClockedIn => "ALREADY_CLOCKED_IN",
            AttendanceError::InvalidStateForBreakStart => "INVALID_STATE_FOR_BREAK_START",
            AttendanceError::InvalidStateForBreakEnd => "INVALID_STATE_FOR_BREAK_END",
            AttendanceError::InvalidStateForClockOut => "INVALID_STATE_FOR_CLOCK_OUT",
            AttendanceError::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            AttendanceError::DuplicatePendingProposal { .. } => "DUPLICATE_PENDING_PROPOSAL",
            AttendanceError::StaleProposal(_) => "STALE_PROPOSAL",
            AttendanceError::NotFound { .. } => "NOT_FOUND",
            AttendanceError::ValidationFailed(_) => "VALIDATION_FAILED",
            AttendanceError::Forbidden(_) => "FORBIDDEN",
            AttendanceError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AttendanceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(ConflictKind::AttendanceDay) => AttendanceError::AlreadyClockedIn,
            StoreError::Conflict(ConflictKind::PendingProposal { day }) => {
                AttendanceError::DuplicatePendingProposal { day }
            }
            StoreError::Conflict(ConflictKind::AlreadyDecided { proposal_id }) => {
                AttendanceError::AlreadyProcessed(proposal_id)
            }
            other => AttendanceError::Storage(other),
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::AlreadyClockedIn
            | AttendanceError::InvalidStateForBreakStart
            | AttendanceError::InvalidStateForBreakEnd
            | AttendanceError::InvalidStateForClockOut
            | AttendanceError::AlreadyProcessed(_)
            | AttendanceError::DuplicatePendingProposal { .. }
            | AttendanceError::StaleProposal(_) => StatusCode::CONFLICT,
            AttendanceError::NotFound { .. } => StatusCode::NOT_FOUND,
            AttendanceError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttendanceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AttendanceError::ValidationFailed(fields) => json!({
                "message": "Validation failed",
                "code": self.code(),
                "fields": fields,
            }),
            AttendanceError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                json!({
                    "message": "Internal Server Error",
                    "code": self.code(),
                })
            }
            other => json!({
                "message": other.to_string(),
                "code": other.code(),
            }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_become_domain_errors() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert!(matches!(
            AttendanceError::from(StoreError::Conflict(ConflictKind::AttendanceDay)),
            AttendanceError::AlreadyClockedIn
        ));
        assert!(matches!(
            AttendanceError::from(StoreError::Conflict(ConflictKind::PendingProposal { day })),
            AttendanceError::DuplicatePendingProposal { day: d } if d == day
        ));
        assert!(matches!(
            AttendanceError::from(StoreError::Corrupt("bad status".into())),
            AttendanceError::Storage(_)
        ));
    }

    #[test]
    fn validation_errors_list_every_field() {
        let err = AttendanceError::ValidationFailed(vec![
            FieldError::new("clock_out", "must be after clock-in"),
            FieldError::new("breaks[0].end", "must be after break start"),
        ]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "Validation failed: clock_out must be after clock-in; breaks[0].end must be after break start"
        );
    }
}
