use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use mentor_core::model::{QuestionDraft, Section, TestDraft, TestId, TestKind, TestStatus};
use serde::Deserialize;
use serde_json::json;
use storage::repository::TestFilter;

use crate::{ApiError, ApiState};

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/tests", get(list_tests).post(create_test))
        .route(
            "/api/tests/{id}",
            get(get_test).put(update_test).delete(delete_test),
        )
        .route("/api/tests/{id}/publish", post(publish_test))
        .route(
            "/api/tests/{id}/questions",
            get(list_questions)
                .post(add_questions)
                .delete(clear_questions),
        )
}

#[derive(Debug, Default, Deserialize)]
struct TestQuery {
    status: Option<TestStatus>,
    kind: Option<TestKind>,
}

#[derive(Debug, Default, Deserialize)]
struct SectionQuery {
    section: Option<Section>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionBatch {
    section: Section,
    questions: Vec<QuestionDraft>,
}

async fn list_tests(
    State(state): State<ApiState>,
    Query(query): Query<TestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TestFilter {
        status: query.status,
        kind: query.kind,
    };
    let tests = state.services.catalog().list_tests(filter).await?;
    Ok(Json(tests))
}

async fn create_test(
    State(state): State<ApiState>,
    Json(draft): Json<TestDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let test = state.services.catalog().create_test(draft).await?;
    Ok((StatusCode::CREATED, Json(test)))
}

async fn get_test(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
) -> Result<impl IntoResponse, ApiError> {
    let test = state
        .services
        .catalog()
        .get_test(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("test {id} not found")))?;
    Ok(Json(test))
}

async fn update_test(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
    Json(draft): Json<TestDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let test = state.services.catalog().update_test(id, draft).await?;
    Ok(Json(test))
}

async fn delete_test(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.catalog().delete_test(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_test(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
) -> Result<impl IntoResponse, ApiError> {
    let test = state.services.catalog().publish_test(id).await?;
    Ok(Json(test))
}

async fn list_questions(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
    Query(query): Query<SectionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let questions = state
        .services
        .catalog()
        .list_questions(id, query.section)
        .await?;
    Ok(Json(questions))
}

async fn add_questions(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
    Json(batch): Json<QuestionBatch>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = state
        .services
        .catalog()
        .add_questions(id, batch.section, batch.questions)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "ids": ids }))))
}

async fn clear_questions(
    State(state): State<ApiState>,
    Path(id): Path<TestId>,
    Query(query): Query<SectionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state
        .services
        .catalog()
        .clear_questions(id, query.section)
        .await?;
    Ok(Json(json!({ "removed": removed })))
}
