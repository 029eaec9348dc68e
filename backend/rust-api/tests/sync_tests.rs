use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use codequest_api::{
    client::{ApiClient, ClientError, PlayerSession},
    quest::{AttemptPhase, Catalog, QuestBoard, QuestMode},
    storage::QuestStore,
    sync::{HttpProgressSink, ProgressRecord, ProgressSink, ProgressSync},
};

mod common;

use common::spawn_server;

const TARGET: &str = "for (int i=0;i<n;i++)";

fn single_snippet_catalog() -> Arc<Catalog> {
    let mut catalog = Catalog::default();
    catalog.add_snippets("java", [TARGET, "return 0;"]);
    catalog.add_template("java", "int x = ___;", ["1"]);
    Arc::new(catalog)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

#[derive(Default)]
struct CountingSink {
    sent: Mutex<Vec<ProgressRecord>>,
}

#[async_trait]
impl ProgressSink for CountingSink {
    async fn send(&self, record: &ProgressRecord) -> Result<(), ClientError> {
        self.sent.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[tokio::test]
async fn typing_progress_reaches_the_server() {
    let (base_url, store) = spawn_server().await;
    let sync = ProgressSync::spawn(
        Arc::new(HttpProgressSink::new(client(&base_url))),
        Duration::from_millis(20),
    );
    let mut board = QuestBoard::new(
        single_snippet_catalog(),
        PlayerSession::signed_in("a@b.com"),
        sync,
        QuestMode::Typing,
        "java",
        0,
    )
    .unwrap();

    for c in TARGET.chars() {
        board.type_char(c).unwrap();
    }
    assert_eq!(board.percentage(), 100);
    assert_eq!(board.phase(), AttemptPhase::InProgress);

    board.into_reporter().shutdown().await;

    let rows = store.list_progress("a@b.com").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quest_id, "typing-java-0");
    assert_eq!(rows[0].progress, 100.0);
    let data: serde_json::Value = serde_json::from_str(&rows[0].data).unwrap();
    assert_eq!(data["typed"], TARGET);
}

#[tokio::test]
async fn switching_exercise_flushes_and_mark_complete_sends_canonical_payload() {
    let (base_url, store) = spawn_server().await;
    let api = client(&base_url);
    // Long window: only flushes and immediate sends can deliver in time
    let sync = ProgressSync::spawn(
        Arc::new(HttpProgressSink::new(api.clone())),
        Duration::from_secs(60),
    );
    let mut board = QuestBoard::new(
        single_snippet_catalog(),
        PlayerSession::signed_in("a@b.com"),
        sync,
        QuestMode::Typing,
        "java",
        0,
    )
    .unwrap();

    board.set_typed("for (").unwrap();
    board.select_mode(QuestMode::FillBlank).unwrap();
    board.mark_complete();
    assert_eq!(board.percentage(), 100);
    assert_eq!(board.phase(), AttemptPhase::MarkedComplete);

    board.into_reporter().shutdown().await;

    let entries = api.fetch_progress("a@b.com").await.unwrap();
    let quests: Vec<(&str, f64)> = entries
        .iter()
        .map(|e| (e.quest_id.as_str(), e.progress))
        .collect();
    assert_eq!(quests, vec![("fill-java-0", 100.0), ("typing-java-0", 23.0)]);

    let rows = store.list_progress("a@b.com").await.unwrap();
    let fill = rows.iter().find(|r| r.quest_id == "fill-java-0").unwrap();
    let data: serde_json::Value = serde_json::from_str(&fill.data).unwrap();
    assert_eq!(data["answers"], serde_json::json!(["1"]));
}

#[tokio::test]
async fn anonymous_player_makes_no_sync_calls() {
    let sink = Arc::new(CountingSink::default());
    let sync = ProgressSync::spawn(sink.clone(), Duration::ZERO);
    let mut board = QuestBoard::new(
        single_snippet_catalog(),
        PlayerSession::anonymous(),
        sync,
        QuestMode::Typing,
        "java",
        0,
    )
    .unwrap();

    for c in TARGET.chars() {
        board.type_char(c).unwrap();
    }
    board.mark_complete();
    board.next_exercise().unwrap();
    board.reset();
    board.into_reporter().shutdown().await;

    assert!(sink.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn api_client_surfaces_server_errors() {
    let (base_url, _) = spawn_server().await;
    let api = client(&base_url);

    let registered = api.register("ada", "ada@example.com", "secret").await.unwrap();
    assert_eq!(registered["message"], "created");

    let err = api
        .register("ada", "ada@example.com", "secret")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.to_string(), "email already registered");

    let err = api.login("ada@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(err.to_string(), "invalid credentials");

    let user = api.login("ada@example.com", "secret").await.unwrap();
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["username"], "ada");
}

#[tokio::test]
async fn api_client_rejects_non_json_bodies() {
    use axum::{routing::post, Router};

    let app = Router::new()
        .route("/api/login", post(|| async { "<html>oops</html>" }))
        .route("/api/register", post(|| async { "" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let api = client(&format!("http://{}", addr));

    let err = api.login("a@b.com", "pw").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidJson));

    // Empty 2xx body reads as an empty object
    let value = api.register("a", "a@b.com", "pw").await.unwrap();
    assert_eq!(value, serde_json::json!({}));
}
