use api::{ApiState, router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use mentor_core::time::fixed_now;
use serde_json::{Value, json};
use services::{AppServices, Clock};
use tower::ServiceExt;

fn app() -> Router {
    router(ApiState {
        services: AppServices::in_memory(Clock::fixed(fixed_now())),
    })
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            req = req.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond");

    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seeded_test(app: &Router) -> u64 {
    let (status, test) = call(
        app,
        Method::POST,
        "/api/tests",
        Some(json!({
            "title": "Placement",
            "durationMinutes": 30,
            "proctoring": { "enabled": true }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = test["id"].as_u64().expect("numeric id");

    let (status, added) = call(
        app,
        Method::POST,
        &format!("/api/tests/{id}/questions"),
        Some(json!({
            "section": "aptitude",
            "questions": [
                { "prompt": "2 + 2", "options": ["3", "4"], "correctAnswer": "1" },
                { "prompt": "3 + 3", "options": ["6", "7"], "correctAnswer": "0" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["ids"].as_array().map(Vec::len), Some(2));

    let (status, published) =
        call(app, Method::POST, &format!("/api/tests/{id}/publish"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "published");
    assert_eq!(published["totalQuestions"], 2);
    id
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = call(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn catalog_errors_use_json_bodies() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/api/tests/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tests",
        Some(json!({ "title": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "test title cannot be empty");
}

#[tokio::test]
async fn exam_round_trip_produces_a_submission() {
    let app = app();
    let test_id = seeded_test(&app).await;

    let (status, snapshot) = call(
        &app,
        Method::POST,
        &format!("/api/tests/{test_id}/exams"),
        Some(json!({ "studentId": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(snapshot["phase"], "in_progress");
    let token = snapshot["token"].as_str().expect("token").to_owned();

    let (status, questions) =
        call(&app, Method::GET, &format!("/api/exams/{token}/questions"), None).await;
    assert_eq!(status, StatusCode::OK);
    let questions = questions.as_array().expect("question list").clone();
    assert_eq!(questions.len(), 2);
    assert!(questions.iter().all(|q| q["correctAnswer"] == ""));

    for q in &questions {
        let answer = if q["prompt"] == "2 + 2" { "4" } else { "6" };
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/exams/{token}/events"),
            Some(json!({ "type": "answer", "questionId": q["id"], "answer": answer })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, after_tab) = call(
        &app,
        Method::POST,
        &format!("/api/exams/{token}/events"),
        Some(json!({ "type": "visibility_hidden" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after_tab["counters"]["tabSwitches"], 1);

    let (status, done) = call(&app, Method::POST, &format!("/api/exams/{token}/submit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["phase"], "complete");
    let submission_id = done["submissionId"].as_u64().expect("submission id");

    let (status, archived) = call(&app, Method::GET, &format!("/api/exams/{token}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["phase"], "complete");
    assert_eq!(archived["submissionId"], submission_id);

    let (status, submission) = call(
        &app,
        Method::GET,
        &format!("/api/submissions/{submission_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submission["overallPercent"], 100);
    assert_eq!(submission["status"], "passed");

    let (status, listed) = call(
        &app,
        Method::GET,
        &format!("/api/submissions?testId={test_id}&studentId=12"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, report) =
        call(&app, Method::GET, &format!("/api/exams/{token}/report"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["violationScore"], 10);
    assert_eq!(report["decision"], "approved");

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/exams/{token}/events"),
        Some(json!({ "type": "next" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn clients_cannot_drive_the_countdown_or_acknowledge() {
    let app = app();
    let test_id = seeded_test(&app).await;
    let (_, snapshot) = call(
        &app,
        Method::POST,
        &format!("/api/tests/{test_id}/exams"),
        Some(json!({ "studentId": 3 })),
    )
    .await;
    let token = snapshot["token"].as_str().expect("token").to_owned();

    for event in [
        json!({ "type": "tick" }),
        json!({ "type": "submit_acknowledged", "submissionId": 1 }),
    ] {
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/exams/{token}/events"),
            Some(event),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn unknown_sessions_are_not_found() {
    let (status, _) = call(
        &app(),
        Method::GET,
        "/api/exams/9b2f6a8e-2c1d-4a47-9d35-4a3a8f0c1e21",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
