use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};
use serde_json::json;

use crate::leave::store::StoreError;
use crate::model::leave::{LeaveStatus, LeaveType};

#[derive(Debug, Display, Error)]
pub enum LeaveError {
    #[display(fmt = "All fields are required")]
    MissingFields,

    #[display(fmt = "Half day period is required when selecting half day leave")]
    HalfDayPeriodRequired,

    #[display(fmt = "For half day leave, from date and end date must be the same")]
    HalfDayDateMismatch,

    #[display(fmt = "End date must be after or equal to start date")]
    InvalidDateRange,

    #[display(fmt = "Employee date of joining not found. Please contact HR.")]
    MissingJoiningDate,

    #[display(
        fmt = "Insufficient {} leave balance. You have {} days remaining out of {} available, but requested {} days.",
        leave_type,
        remaining,
        available,
        requested
    )]
    InsufficientBalance {
        leave_type: LeaveType,
        remaining: f64,
        available: f64,
        requested: f64,
    },

    #[display(fmt = "Invalid year: {}", _0)]
    InvalidYear(#[error(not(source))] i32),

    #[display(fmt = "Leave request is already {}", _0)]
    AlreadyReviewed(#[error(not(source))] LeaveStatus),

    #[display(fmt = "Employee not found")]
    EmployeeNotFound,

    #[display(fmt = "Leave request not found")]
    LeaveNotFound,

    #[display(fmt = "Employee profile required")]
    NoEmployeeProfile,

    #[display(fmt = "Not allowed to access this employee's leave records")]
    Forbidden,

    #[display(fmt = "Internal server error")]
    Database(sqlx::Error),

    #[display(fmt = "Internal server error")]
    CorruptRecord(#[error(not(source))] String),
}

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        LeaveError::Database(err)
    }
}

impl From<StoreError> for LeaveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => LeaveError::Database(e),
            StoreError::Corrupt(detail) => LeaveError::CorruptRecord(detail),
        }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::EmployeeNotFound | LeaveError::LeaveNotFound => StatusCode::NOT_FOUND,
            LeaveError::NoEmployeeProfile | LeaveError::Forbidden => StatusCode::FORBIDDEN,
            LeaveError::Database(_) | LeaveError::CorruptRecord(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            LeaveError::Database(e) => tracing::error!(error = %e, "Leave database error"),
            LeaveError::CorruptRecord(detail) => tracing::error!(detail = %detail, "Corrupt leave record"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_reports_exact_figures() {
        let err = LeaveError::InsufficientBalance {
            leave_type: LeaveType::Casual,
            remaining: 1.5,
            available: 4.0,
            requested: 3.0,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient casual leave balance. You have 1.5 days remaining out of 4 available, but requested 3 days."
        );
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookups_and_validation_map_to_distinct_statuses() {
        assert_eq!(LeaveError::EmployeeNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(LeaveError::LeaveNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(LeaveError::MissingFields.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            LeaveError::AlreadyReviewed(LeaveStatus::Approved).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(LeaveError::Forbidden.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn database_errors_stay_generic() {
        let err = LeaveError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn error_body_is_json() {
        let resp = LeaveError::HalfDayPeriodRequired.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(
            value["error"],
            "Half day period is required when selecting half day leave"
        );
    }
}
