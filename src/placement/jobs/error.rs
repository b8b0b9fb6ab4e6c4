use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::JobValidationError;
use super::repository::RepositoryError;

/// Handler-boundary error. Every failure is rendered as `{ "error": <message> }`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobBoardError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl JobBoardError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            JobBoardError::BadRequest(_) => StatusCode::BAD_REQUEST,
            JobBoardError::Forbidden(_) => StatusCode::FORBIDDEN,
            JobBoardError::NotFound(_) => StatusCode::NOT_FOUND,
            JobBoardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for JobBoardError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Validation(err) => Self::BadRequest(err.to_string()),
            err @ RepositoryError::NotFound(_) => Self::NotFound(err.to_string()),
            RepositoryError::Conflict => Self::Internal(
                "job was modified concurrently; reload it and try again".to_string(),
            ),
            RepositoryError::Unavailable(msg) => Self::Internal(msg),
        }
    }
}

impl From<JobValidationError> for JobBoardError {
    fn from(value: JobValidationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl IntoResponse for JobBoardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
