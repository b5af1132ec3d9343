use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use mentor_core::model::{SessionToken, StudentId, TestId};
use mentor_core::session::SessionEvent;
use serde::Deserialize;

use crate::{ApiError, ApiState};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/tests/{id}/exams", post(start_exam))
        .route("/api/exams/{token}", get(snapshot))
        .route("/api/exams/{token}/questions", get(questions))
        .route("/api/exams/{token}/events", post(dispatch))
        .route("/api/exams/{token}/submit", post(submit))
        .route("/api/exams/{token}/report", get(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartExam {
    student_id: StudentId,
}

async fn start_exam(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
    Json(body): Json<StartExam>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state
        .services
        .exams()
        .start_exam(id, body.student_id)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn snapshot(
    State(state): State<ApiState>,
    Path(token): Path<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.exams().snapshot(token).await?))
}

async fn questions(
    State(state): State<ApiState>,
    Path(token): Path<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.exams().questions(token).await?))
}

async fn dispatch(
    State(state): State<ApiState>,
    Path(token): Path<SessionToken>,
    Json(event): Json<SessionEvent>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.exams().dispatch(token, event).await?))
}

async fn submit(
    State(state): State<ApiState>,
    Path(token): Path<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.exams().submit(token).await?))
}

async fn report(
    State(state): State<ApiState>,
    Path(token): Path<SessionToken>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.services.exams().report(token).await?))
}
