//! HTTP routes served on an ephemeral port.

mod support;

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{json, Value};
use taskboard::counters::{CounterCache, CounterSnapshot};
use taskboard::server::{self, AppState};
use taskboard::task::today;
use taskboard::tracker::BugRecord;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use support::TestDataDir;

struct TestServer {
    base: String,
    http: reqwest::Client,
    counters: CounterCache,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<taskboard::Result<()>>,
    _data: TestDataDir,
}

impl TestServer {
    async fn start() -> Self {
        let data = TestDataDir::new();
        let board = Arc::new(data.open_board());
        let counters = CounterCache::new();
        let state = AppState::new(board, counters.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server::serve(listener, state, async move {
            let _ = rx.await;
        }));

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            counters,
            shutdown: Some(tx),
            handle,
            _data: data,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.http.get(self.url(path)).send().await.expect("get");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("post");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .http
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("put");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.http.delete(self.url(path)).send().await.expect("delete");
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let result = (&mut self.handle).await.expect("server task");
        assert!(result.is_ok(), "server exited with {result:?}");
    }
}

#[tokio::test]
async fn create_list_update_delete() {
    let server = TestServer::start().await;

    let (status, created) = server
        .post(
            "/api/tasks",
            json!({ "title": "A", "owner": "bob", "status": "open" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["id"], 1);
    assert_eq!(created["startTime"], today());
    assert_eq!(created["endTime"], "");

    let (status, updated) = server
        .put("/api/tasks/1", json!({ "status": "closed", "color": "red" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "closed");
    assert_eq!(updated["owner"], "bob");

    let (_, tasks) = server.get("/api/tasks").await;
    assert_eq!(tasks.as_array().map(Vec::len), Some(1));
    assert_eq!(tasks[0]["status"], "closed");

    let (status, _) = server.delete("/api/tasks/1").await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, tasks) = server.get("/api/tasks").await;
    assert_eq!(tasks, json!([]));

    let (status, history) = server.get("/api/tasks/1/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().map(Vec::len), Some(1));
    assert_eq!(history[0]["taskId"], 1);
    assert_eq!(history[0]["taskTitle"], "A");
    assert_eq!(history[0]["field"], "status");
    assert_eq!(history[0]["oldValue"], "open");
    assert_eq!(history[0]["newValue"], "closed");

    server.stop().await;
}

#[tokio::test]
async fn missing_task_is_404() {
    let server = TestServer::start().await;

    let (status, body) = server.put("/api/tasks/42", json!({ "status": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap_or_default().contains("42"));

    let (status, _) = server.delete("/api/tasks/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, history) = server.get("/api/tasks/42/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn non_numeric_id_is_400() {
    let server = TestServer::start().await;

    let (status, body) = server.put("/api/tasks/abc", json!({ "status": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("Invalid ID"));

    let (status, _) = server.get("/api/tasks/abc/history").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The id is rejected before a malformed body is looked at.
    let resp = server
        .http
        .put(server.url("/api/tasks/abc"))
        .body("{not json")
        .send()
        .await
        .expect("put");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("error body");
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("Invalid ID"));

    server.stop().await;
}

#[tokio::test]
async fn unchanged_fields_add_no_history() {
    let server = TestServer::start().await;
    server
        .post("/api/tasks", json!({ "title": "A", "status": "open" }))
        .await;

    let (status, _) = server.put("/api/tasks/1", json!({ "status": "open" })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.put("/api/tasks/1", Value::Null).await;
    assert_eq!(status, StatusCode::OK);

    let resp = server
        .http
        .put(server.url("/api/tasks/1"))
        .body("{not json")
        .send()
        .await
        .expect("put");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, history) = server.get("/api/history").await;
    assert_eq!(history, json!([]));

    server.stop().await;
}

#[tokio::test]
async fn ids_increase_across_deletes() {
    let server = TestServer::start().await;

    for title in ["A", "B"] {
        server.post("/api/tasks", json!({ "title": title })).await;
    }
    server.delete("/api/tasks/2").await;
    let (_, created) = server.post("/api/tasks", json!({ "title": "C" })).await;
    assert_eq!(created["id"], 3);

    server.stop().await;
}

#[tokio::test]
async fn bug_counters_unavailable_until_fetched() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/bugs").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.get("error").is_some());

    let records: Vec<BugRecord> = serde_json::from_value(json!([
        { "resolvedBy": { "realname": "X" }, "assignedTo": { "realname": "Y" } },
        { "resolvedBy": { "realname": "X" }, "assignedTo": { "realname": "Y" } },
    ]))
    .expect("records");
    server
        .counters
        .replace(CounterSnapshot::aggregate(&records, chrono::Utc::now()));

    let (status, body) = server.get("/api/bugs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved"], json!({ "X": 2 }));
    assert_eq!(body["unresolved"], json!({ "Y": 2 }));
    assert_eq!(body["records"], 2);
    assert!(body.get("fetchedAt").is_some());

    server.stop().await;
}

#[tokio::test]
async fn healthz_answers() {
    let server = TestServer::start().await;

    let resp = server
        .http
        .get(server.url("/healthz"))
        .send()
        .await
        .expect("get");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    server.stop().await;
}
