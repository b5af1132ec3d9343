use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use mentor_core::model::{StudentId, SubmissionId, TestId};
use serde::Deserialize;
use storage::repository::SubmissionFilter;

use crate::{ApiError, ApiState};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/submissions", get(list_submissions))
        .route(
            "/api/submissions/{id}",
            get(get_submission).delete(delete_submission),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionQuery {
    test_id: Option<TestId>,
    student_id: Option<StudentId>,
}

async fn list_submissions(
    State(state): State<ApiState>,
    Query(query): Query<SubmissionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = SubmissionFilter {
        test_id: query.test_id,
        student_id: query.student_id,
    };
    Ok(Json(state.services.submissions().list(filter).await?))
}

async fn get_submission(
    State(state): State<ApiState>,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = state
        .services
        .submissions()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("submission {id} not found")))?;
    Ok(Json(submission))
}

async fn delete_submission(
    State(state): State<ApiState>,
    Path(id): Path<SubmissionId>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.submissions().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
