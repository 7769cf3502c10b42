//! Router tests driven with `tower::ServiceExt::oneshot`

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use llm::LlmError;
use research_agent::nodes::ResearchContext;
use research_agent::testing::ScriptedModel;
use research_agent::{Configuration, ResearchGraph};
use research_server::api::handlers::FRONTEND_NOT_BUILT;
use research_server::api::{ApiErrorResponse, HealthResponse, RunOutput};
use research_server::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(model: ScriptedModel) -> Router {
    let ctx = ResearchContext::new(Arc::new(model), Configuration::default()).with_date("July 15, 2024");
    create_router(AppState::new(ResearchGraph::from_context(ctx)), None)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn low_effort_request() -> Value {
    json!({
        "messages": [{"type": "human", "content": "Who was the top scorer of Euro 2024?"}],
        "effort": "low"
    })
}

#[tokio::test]
async fn test_health() {
    let response = app(ScriptedModel::new())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn test_runs_wait_returns_final_output() {
    let response = app(ScriptedModel::new())
        .oneshot(post_json("/runs/wait", low_effort_request()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let output: RunOutput = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(output.research_loop_count, 1);
    assert_eq!(output.messages.len(), 2);
    assert!(output.messages[1].is_assistant());
    assert!(!output.sources.is_empty());
    assert!(output.unresolved_citations.is_empty());
}

#[tokio::test]
async fn test_empty_messages_rejected() {
    let model = ScriptedModel::new();
    let response = app(model.clone())
        .oneshot(post_json("/runs/wait", json!({"messages": []})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ApiErrorResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn test_zero_count_rejected_on_stream() {
    let request = json!({
        "messages": [{"type": "human", "content": "q"}],
        "initial_search_query_count": 0
    });
    let response = app(ScriptedModel::new())
        .oneshot(post_json("/runs/stream", request))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/runs/wait")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app(ScriptedModel::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_runs_stream_sse_framing() {
    let response = app(ScriptedModel::new())
        .oneshot(post_json("/runs/stream", low_effort_request()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let body = body_string(response).await;
    let events: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(events, vec!["updates", "updates", "updates", "updates", "values"]);

    let first_data = body
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    let payload: Value = serde_json::from_str(first_data).unwrap();
    assert_eq!(payload["generate_query"]["search_query"], json!(["primary topic query"]));
}

#[tokio::test]
async fn test_runs_stream_reports_failure_as_error_event() {
    let model = ScriptedModel::new().on_research(|_, _| Err(LlmError::ServiceUnavailable("down".to_string())));
    let response = app(model)
        .oneshot(post_json("/runs/stream", low_effort_request()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let events: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(events, vec!["updates", "error"]);

    let error_data = body.lines().filter_map(|line| line.strip_prefix("data: ")).last().unwrap();
    let error: ApiErrorResponse = serde_json::from_str(error_data).unwrap();
    assert_eq!(error.code, "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_frontend_missing_answers_503() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = ResearchContext::new(Arc::new(ScriptedModel::new()), Configuration::default());
    let app = create_router(AppState::new(ResearchGraph::from_context(ctx)), Some(dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/app/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ApiErrorResponse = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(body.message, FRONTEND_NOT_BUILT);
}

#[tokio::test]
async fn test_frontend_build_is_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>research</html>").unwrap();
    let ctx = ResearchContext::new(Arc::new(ScriptedModel::new()), Configuration::default());
    let app = create_router(AppState::new(ResearchGraph::from_context(ctx)), Some(dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/app/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "<html>research</html>");
}
