//! Mapping of service errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mentor_core::session::SessionEventError;
use serde_json::json;
use services::{CatalogError, ExamError};
use storage::repository::StorageError;
use thiserror::Error;

/// Every handler error ends up as `{ "error": "..." }` with a fitting status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound(err.to_string()),
            StorageError::Conflict => ApiError::Conflict(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TestNotFound(_) => ApiError::NotFound(err.to_string()),
            CatalogError::Storage(inner) => inner.into(),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<ExamError> for ApiError {
    fn from(err: ExamError) -> Self {
        match err {
            ExamError::TestNotFound(_) | ExamError::UnknownSession(_) => {
                ApiError::NotFound(err.to_string())
            }
            ExamError::Closed(_) | ExamError::AttemptsExhausted { .. } => {
                ApiError::Forbidden(err.to_string())
            }
            ExamError::Event(SessionEventError::WrongPhase { .. })
            | ExamError::NothingToSubmit
            | ExamError::Finished(_) => ApiError::Conflict(err.to_string()),
            ExamError::Event(_) | ExamError::ReservedEvent(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ExamError::Storage(inner) => inner.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_core::model::{SessionToken, TestError, TestId};
    use mentor_core::session::SessionPhase;

    #[test]
    fn exam_errors_map_to_client_statuses() {
        let cases = [
            (ExamError::TestNotFound(TestId::new(1)), StatusCode::NOT_FOUND),
            (
                ExamError::UnknownSession(SessionToken::generate()),
                StatusCode::NOT_FOUND,
            ),
            (ExamError::Closed(TestError::NotPublished), StatusCode::FORBIDDEN),
            (ExamError::AttemptsExhausted { max: 1 }, StatusCode::FORBIDDEN),
            (
                ExamError::Finished(SessionToken::generate()),
                StatusCode::CONFLICT,
            ),
            (
                ExamError::Event(SessionEventError::WrongPhase {
                    event: "answer",
                    phase: SessionPhase::Complete,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ExamError::Event(SessionEventError::CameraRequired),
                StatusCode::BAD_REQUEST,
            ),
            (
                ExamError::Storage(StorageError::Connection("gone".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_details_stay_out_of_the_message() {
        let err = ApiError::from(StorageError::Connection("secret dsn".into()));
        assert_eq!(err.to_string(), "internal server error");
    }
}
