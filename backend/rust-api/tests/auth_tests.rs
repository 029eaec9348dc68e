use axum::http::StatusCode;
use serde_json::json;

mod common;

use common::{create_test_app, send_json};

async fn register(app: &axum::Router, username: &str, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send_json(
        app,
        "POST",
        "/api/register",
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await
}

async fn login(app: &axum::Router, email: &str, password: &str) -> (StatusCode, serde_json::Value) {
    send_json(
        app,
        "POST",
        "/api/login",
        Some(json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_register_success() {
    let (app, _) = create_test_app();

    let (status, body) = register(&app, "ada", "ada@example.com", "secret").await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "created");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (app, _) = create_test_app();

    let (status, _) = register(&app, "ada", "ada@example.com", "secret").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = register(&app, "other", "ada@example.com", "another").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email already registered" }));
}

#[tokio::test]
async fn test_register_requires_email_and_password() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/register",
        Some(json!({ "username": "ada", "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email and password required" }));

    let (status, _) = register(&app, "ada", "", "secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_malformed_email() {
    let (app, _) = create_test_app();

    let (status, body) = register(&app, "ada", "not-an-email", "secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Validation error"));
}

#[tokio::test]
async fn test_register_rejects_overlong_username() {
    let (app, store) = create_test_app();

    let (status, body) = register(&app, &"a".repeat(101), "ada@example.com", "secret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Validation error"));

    use codequest_api::storage::QuestStore;
    assert!(store.find_user_by_email("ada@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_login_success() {
    let (app, _) = create_test_app();
    let (_, registered) = register(&app, "ada", "ada@example.com", "secret").await;

    let (status, body) = login(&app, "ada@example.com", "secret").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], registered["id"]);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _) = create_test_app();
    register(&app, "ada", "ada@example.com", "secret").await;

    let (status, body) = login(&app, "ada@example.com", "wrong").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "invalid credentials" }));
}

#[tokio::test]
async fn test_login_unknown_email() {
    let (app, _) = create_test_app();

    let (status, body) = login(&app, "nobody@example.com", "secret").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "invalid credentials" }));
}

#[tokio::test]
async fn test_login_missing_password() {
    let (app, _) = create_test_app();

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/login",
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email and password required" }));
}
