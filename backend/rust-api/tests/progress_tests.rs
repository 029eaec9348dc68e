use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;

mod common;

use common::{create_test_app, send, send_json};

#[tokio::test]
async fn test_progress_upsert_and_list() {
    let (app, _) = create_test_app();

    let (status, first) = send_json(
        &app,
        "POST",
        "/api/progress",
        Some(json!({
            "email": "a@b.com",
            "questId": "typing-java-0",
            "progress": 40,
            "data": "{\"typed\":\"for\"}",
            "seq": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "ok");

    let (status, second) = send_json(
        &app,
        "POST",
        "/api/progress",
        Some(json!({
            "email": "a@b.com",
            "questId": "typing-java-0",
            "progress": 75,
            "data": "{\"typed\":\"for (int\"}",
            "seq": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Same row is updated in place
    assert_eq!(second["id"], first["id"]);

    let (status, list) = send_json(&app, "GET", "/api/progress/a@b.com", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = list.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["questId"], "typing-java-0");
    assert_eq!(entries[0]["progress"], 75.0);
    assert_eq!(entries[0]["data"], "{\"typed\":\"for (int\"}");
}

#[tokio::test]
async fn test_stale_seq_is_ignored() {
    let (app, store) = create_test_app();

    let post = |progress: u8, seq: u64| {
        send_json(
            &app,
            "POST",
            "/api/progress",
            Some(json!({
                "email": "a@b.com",
                "questId": "fill-java-0",
                "progress": progress,
                "seq": seq
            })),
        )
    };

    let (_, applied) = post(100, 20).await;
    assert_eq!(applied["message"], "ok");

    let (status, stale) = post(50, 10).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stale["message"], "stale");
    assert_eq!(stale["id"], applied["id"]);

    use codequest_api::storage::QuestStore;
    let rows = store.list_progress("a@b.com").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].progress, 100.0);
    assert_eq!(rows[0].seq, Some(20));
}

#[tokio::test]
async fn test_progress_defaults_and_clamping() {
    let (app, store) = create_test_app();

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/progress",
        Some(json!({ "email": "a@b.com", "questId": "typing-python-1", "progress": 140 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    use codequest_api::storage::QuestStore;
    let rows = store.list_progress("a@b.com").await.unwrap();
    assert_eq!(rows[0].progress, 100.0);
    assert_eq!(rows[0].data, "null");
    assert_eq!(rows[0].seq, None);
}

#[tokio::test]
async fn test_progress_requires_email_and_quest() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/progress",
        Some(json!({ "email": "a@b.com", "progress": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email and questId required" }));

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/progress",
        Some(json!({ "email": "", "questId": "typing-java-0", "progress": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (app, _) = create_test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/progress")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse JSON request body"));
}

#[tokio::test]
async fn test_list_is_sorted_and_scoped_to_player() {
    let (app, _) = create_test_app();

    for (email, quest) in [
        ("a@b.com", "typing-python-0"),
        ("a@b.com", "fill-java-0"),
        ("other@b.com", "typing-java-0"),
    ] {
        let (status, _) = send_json(
            &app,
            "POST",
            "/api/progress",
            Some(json!({ "email": email, "questId": quest, "progress": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = send_json(&app, "GET", "/api/progress/a@b.com", None).await;
    let quests: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["questId"].as_str().unwrap())
        .collect();
    assert_eq!(quests, vec!["fill-java-0", "typing-python-0"]);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/progress")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["dependencies"]["storage"]["backend"], "memory");
}

#[tokio::test]
async fn test_metrics_requires_basic_auth() {
    let (app, _) = create_test_app();

    let (status, _) = send_json(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
