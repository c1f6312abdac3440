//! `POST /api/run-python` end to end through the axum router.

#![cfg(unix)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pyexec::config::Config;
use pyexec::engine::ExecutionService;
use pyexec::runtime::router;

fn app_with(fallbacks: &[&str], timeout_ms: u64) -> Router {
    let mut cfg = Config::default();
    cfg.runtime.fallbacks = fallbacks.iter().map(|s| s.to_string()).collect();
    cfg.limits.timeout_ms = timeout_ms;
    router(ExecutionService::from_config(&cfg), cfg.server.max_body_bytes)
}

fn app() -> Router {
    app_with(&["sh"], 2000)
}

async fn post(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/api/run-python")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: Router, payload: Value) -> (StatusCode, Value) {
    post(app, payload.to_string()).await
}

#[tokio::test]
async fn health_is_ok() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn successful_run() {
    let (status, body) = post_json(app(), json!({ "code": "printf 'hi there'" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "stdout": "hi there", "stderr": "", "exitCode": 0, "success": true })
    );
}

#[tokio::test]
async fn snippet_failure_is_still_200() {
    let (status, body) = post_json(app(), json!({ "code": "echo boom >&2; exit 4" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exitCode"], 4);
    assert_eq!(body["stderr"], "boom\n");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn timeout_is_200_with_marker() {
    let (status, body) = post_json(
        app_with(&["sh"], 300),
        json!({ "code": "while :; do :; done" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["exitCode"], 1);
    assert_eq!(body["stderr"], "Execution timed out.");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn rejections_are_400_with_messages() {
    let cases: Vec<(Body, &str)> = vec![
        (Body::from("{oops"), "Invalid JSON payload."),
        (Body::from("\"just a string\""), "Payload must be an object."),
        (Body::from(r#"{"code": ["x"]}"#), "'code' must be a string."),
        (Body::from(r#"{"language": "python"}"#), "'code' must be a string."),
        (Body::from(r#"{"code": "   \n"}"#), "Code snapshot is empty."),
    ];

    for (body, message) in cases {
        let (status, json) = post(app(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{message}");
        assert_eq!(
            json,
            json!({ "stdout": "", "stderr": message, "exitCode": 1, "success": false })
        );
    }
}

#[tokio::test]
async fn blank_code_is_rejected_even_without_interpreters() {
    let (status, body) = post_json(
        app_with(&["/nonexistent/python"], 1000),
        json!({ "code": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["stderr"], "Code snapshot is empty.");
}

#[tokio::test]
async fn fallback_is_transparent() {
    let (status, body) = post_json(
        app_with(&["/nonexistent/python3", "sh"], 2000),
        json!({ "code": "printf fallback" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stdout"], "fallback");
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn no_interpreter_is_500() {
    let (status, body) = post_json(
        app_with(&["/nonexistent/python3", "/nonexistent/python"], 2000),
        json!({ "code": "print(1)" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stdout"], "");
    assert_eq!(body["exitCode"], 1);
    assert_eq!(body["success"], false);

    let detail = body["stderr"].as_str().unwrap();
    assert!(detail.starts_with("No Python interpreter available"));
    assert!(detail.contains("/nonexistent/python"));
}

#[tokio::test]
async fn oversized_body_gets_the_result_shape() {
    let mut cfg = Config::default();
    cfg.runtime.fallbacks = vec!["sh".to_string()];
    let app = router(ExecutionService::from_config(&cfg), 64);

    let code = "x".repeat(200);
    let (status, body) = post_json(app, json!({ "code": code })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body,
        json!({ "stdout": "", "stderr": "Payload too large.", "exitCode": 1, "success": false })
    );
}

#[tokio::test]
async fn shut_down_service_answers_500() {
    let mut cfg = Config::default();
    cfg.runtime.fallbacks = vec!["sh".to_string()];
    let svc = ExecutionService::from_config(&cfg);
    svc.shutdown();

    let (status, body) = post_json(
        router(svc, cfg.server.max_body_bytes),
        json!({ "code": "printf never" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stdout"], "");
    assert_eq!(body["stderr"], "Execution service is shutting down.");
}

#[tokio::test]
async fn source_alias_is_accepted() {
    let (status, body) = post_json(app(), json!({ "source": "printf alias" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stdout"], "alias");
}
