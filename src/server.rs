//! HTTP surface over the task board and the counter cache.
//!
//! Board operations do synchronous file I/O under the board lock, so handlers
//! run them on the blocking pool. Counter reads never touch the network.

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::board::TaskBoard;
use crate::counters::{CounterCache, CounterSnapshot};
use crate::error::{Error, Result};
use crate::history::HistoryEntry;
use crate::task::{NewTask, Task, TaskPatch};

/// Shared state for axum handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub board: Arc<TaskBoard>,
    pub counters: CounterCache,
}

impl AppState {
    pub fn new(board: Arc<TaskBoard>, counters: CounterCache) -> Self {
        Self { board, counters }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", axum::routing::put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/history", get(task_history))
        .route("/api/history", get(all_history))
        .route("/api/bugs", get(bug_counters))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn parse_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid ID: {raw}")))
}

/// A blank body is an empty patch
fn parse_patch(body: &[u8]) -> Result<TaskPatch> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TaskPatch::new());
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::InvalidArgument(format!("Invalid task update: {e}")))
}

/// Run a board operation on the blocking pool
async fn with_board<T, F>(board: Arc<TaskBoard>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&TaskBoard) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&board))
        .await
        .map_err(|e| Error::OperationFailed(format!("board task failed: {e}")))?
}

async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>> {
    with_board(state.board, |board| board.list()).await.map(Json)
}

async fn create_task(
    State(state): State<AppState>,
    Json(new): Json<NewTask>,
) -> Result<Json<Task>> {
    with_board(state.board, move |board| board.create(new))
        .await
        .map(Json)
}

/// The id is checked before the body, so a bad id is a 400 whatever the body holds
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Task>> {
    let id = parse_id(&id)?;
    let patch = parse_patch(&body)?;
    with_board(state.board, move |board| board.update(id, &patch))
        .await
        .map(Json)
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    with_board(state.board, move |board| board.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn task_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let id = parse_id(&id)?;
    with_board(state.board, move |board| board.history_for_task(id))
        .await
        .map(Json)
}

async fn all_history(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntry>>> {
    with_board(state.board, |board| board.history()).await.map(Json)
}

async fn bug_counters(State(state): State<AppState>) -> Result<Json<CounterSnapshot>> {
    let snapshot = state.counters.snapshot()?;
    Ok(Json(CounterSnapshot::clone(&snapshot)))
}
