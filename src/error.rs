use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failures reported by the course service.
#[derive(Debug, Error)]
pub enum CourseError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid {field} '{value}': expected YYYY-MM-DD")]
    Parse { field: &'static str, value: String },

    #[error("start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("Course '{id}' doesn't exist")]
    NotFound { id: String },

    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CourseError {
    pub fn not_found(id: impl Into<String>) -> Self {
        CourseError::NotFound { id: id.into() }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Internal server error")]
    InternalServerError,
}

impl From<CourseError> for AppError {
    fn from(err: CourseError) -> Self {
        match err {
            CourseError::Validation(_)
            | CourseError::Parse { .. }
            | CourseError::DateRange { .. } => AppError::BadRequest(err.to_string()),
            CourseError::NotFound { .. } => AppError::NotFound(err.to_string()),
            CourseError::Store(e) => AppError::Database(e),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Request timed out".to_string(),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
