use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use progress_board_back::{
    config::AppConfig,
    dao::kv_store::MemoryKvStore,
    routes,
    state::{AppState, SharedState},
};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn connected_state() -> SharedState {
    let state = AppState::new(AppConfig::default());
    state.set_kv_store(Arc::new(MemoryKvStore::new())).await;
    state
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(payload) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn save_then_load_consumes_snapshot() {
    let app = routes::router(connected_state().await);

    let (status, body) = send(
        &app,
        Method::POST,
        "/save",
        Some(json!({"uid": "u1", "state": {"level": 3, "score": 40}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, body) = send(&app, Method::GET, "/load?uid=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"state": {"level": 3, "score": 40}}));

    let (status, body) = send(&app, Method::GET, "/load?uid=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"state": null}));
}

#[tokio::test]
async fn submit_ranks_score_and_retires_snapshot() {
    let app = routes::router(connected_state().await);

    send(
        &app,
        Method::POST,
        "/save",
        Some(json!({"uid": "u1", "state": {"score": 10}})),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/submit",
        Some(json!({"uid": "u1", "name": "Ann", "score": 120})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/load?uid=u1", None).await;
    assert_eq!(body, json!({"state": null}));

    let (status, body) = send(&app, Method::GET, "/leaderboard?view=completed", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "Ann");
    assert_eq!(entries[0]["score"], 120.0);
    assert_eq!(entries[0]["rank"], 1);
    assert_eq!(entries[0]["status"], "completed");
}

#[tokio::test]
async fn live_leaderboard_merges_in_progress_scores() {
    let app = routes::router(connected_state().await);

    send(
        &app,
        Method::POST,
        "/submit",
        Some(json!({"uid": "done", "name": "Bea", "score": 50})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/save",
        Some(json!({"uid": "live", "state": {"score": 80, "username": "Cid"}})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/save",
        Some(json!({"uid": "unscored", "state": {"level": 1}})),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "Cid");
    assert_eq!(entries[0]["status"], "in-progress");
    assert_eq!(entries[1]["name"], "Bea");

    let (_, completed) = send(&app, Method::GET, "/leaderboard?view=completed", None).await;
    assert_eq!(completed["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = routes::router(connected_state().await);

    let (status, _) = send(&app, Method::POST, "/save", Some(json!({"uid": "u1", "state": {}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/save", Some(json!({"state": {"a": 1}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/load", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/submit",
        Some(json!({"uid": "u1", "name": "Ann"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, Method::GET, "/leaderboard?view=completed", None).await;
    assert_eq!(body["entries"], json!([]));
}

#[tokio::test]
async fn zero_score_is_accepted() {
    let app = routes::router(connected_state().await);

    let (status, _) = send(
        &app,
        Method::POST,
        "/submit",
        Some(json!({"uid": "u1", "name": "Zed", "score": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn degraded_mode_answers_service_unavailable() {
    let state = AppState::new(AppConfig::default());
    let app = routes::router(state);

    let (status, body) = send(&app, Method::GET, "/load?uid=u1", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");

    let (status, _) = send(&app, Method::GET, "/leaderboard", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "degraded"}));
}

#[tokio::test]
async fn healthcheck_reports_ok_with_store() {
    let app = routes::router(connected_state().await);

    let (status, body) = send(&app, Method::GET, "/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
