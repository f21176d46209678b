use axum::http::StatusCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Failures surfaced by the tracking core and its storage backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The persistence backend could not be reached. Transient; the caller may retry.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("validation failed: {0}")]
    Validation(String),
    /// The referenced goal no longer exists.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no goal selected")]
    NoGoalSelected,
    #[error("date out of supported range: {0}")]
    DateOutOfRange(NaiveDate),
}

impl TrackerError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match err {
            TrackerError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::Validation(_) | TrackerError::DateOutOfRange(_) => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::NoGoalSelected => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
