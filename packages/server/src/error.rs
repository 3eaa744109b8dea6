use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::competition::ClosedReason;
use common::score::{LockError, ScoreError};
use sea_orm::DbErr;
use serde::Serialize;

use crate::evaluator::EvaluatorError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `CONFIRMATION_REQUIRED`, `UNSCORED_SUBMISSIONS`, `EVALUATOR_UNAVAILABLE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Score must be between 1 and 10")]
    pub message: String,
    /// Score already stored, present on `CONFIRMATION_REQUIRED`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 7)]
    pub existing_score: Option<i32>,
    /// Submissions still lacking a score, present on `UNSCORED_SUBMISSIONS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 3)]
    pub remaining: Option<u64>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            existing_score: None,
            remaining: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    PermissionDenied,
    NotFound(String),
    Conflict(String),
    /// A judge score exists and the caller did not confirm the overwrite.
    ConfirmationRequired {
        existing_score: i32,
    },
    /// The participant still has submissions without a judge score.
    UnscoredSubmissions {
        remaining: u64,
    },
    Evaluator(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new("VALIDATION_ERROR", msg))
            }
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_INVALID", "Invalid or expired token"),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("PERMISSION_DENIED", "Insufficient permissions"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::new("CONFLICT", msg)),
            AppError::ConfirmationRequired { existing_score } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    existing_score: Some(existing_score),
                    ..ErrorBody::new(
                        "CONFIRMATION_REQUIRED",
                        ScoreError::OverwriteUnconfirmed {
                            existing: existing_score,
                        }
                        .to_string(),
                    )
                },
            ),
            AppError::UnscoredSubmissions { remaining } => (
                StatusCode::CONFLICT,
                ErrorBody {
                    remaining: Some(remaining),
                    ..ErrorBody::new(
                        "UNSCORED_SUBMISSIONS",
                        LockError::Unscored { remaining }.to_string(),
                    )
                },
            ),
            AppError::Evaluator(detail) => {
                tracing::warn!("Evaluator request failed: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody::new("EVALUATOR_UNAVAILABLE", "Evaluator service is unavailable"),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ScoreError> for AppError {
    fn from(err: ScoreError) -> Self {
        match err {
            ScoreError::OverwriteUnconfirmed { existing } => AppError::ConfirmationRequired {
                existing_score: existing,
            },
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::NotConfirmed => AppError::Validation(err.to_string()),
            LockError::AlreadyLocked => AppError::Conflict(err.to_string()),
            LockError::Unscored { remaining } => AppError::UnscoredSubmissions { remaining },
        }
    }
}

impl From<ClosedReason> for AppError {
    fn from(reason: ClosedReason) -> Self {
        AppError::Validation(reason.to_string())
    }
}

impl From<EvaluatorError> for AppError {
    fn from(err: EvaluatorError) -> Self {
        AppError::Evaluator(err.to_string())
    }
}
