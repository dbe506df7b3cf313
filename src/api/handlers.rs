//! Request handlers.

use super::{AppState, AuthSession};
use crate::chat::ChatReply;
use crate::error::{AppError, AppResult};
use crate::llm::Role;
use crate::types::{NewTask, Priority, Task, TaskStatus, User, normalize_tags, parse_due_date};
use crate::views::{CalendarEvent, PrioritySort, TaskBoard, TaskQuery, TaskStats, calendar_events};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Run CPU-heavy work (password hashing) off the async workers.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::storage(format!("worker task failed: {}", e)))?
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Accounts

#[derive(Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    token: String,
    username: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<(StatusCode, Json<User>)> {
    let db = state.db.clone();
    let user = blocking(move || db.create_user(&body.username, &body.password)).await?;
    info!(username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> AppResult<Json<LoginResponse>> {
    let db = state.db.clone();
    let user = blocking(move || db.authenticate(&body.username, &body.password)).await?;
    let session = state.sessions.create(&user.username)?;
    Ok(Json(LoginResponse {
        token: session.token,
        username: session.username,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<StatusCode> {
    state.sessions.remove(&session.token)?;
    Ok(StatusCode::NO_CONTENT)
}

// Tasks

#[derive(Deserialize, Default)]
pub struct BoardParams {
    status: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

impl BoardParams {
    fn into_query(self) -> AppResult<TaskQuery> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) if s.eq_ignore_ascii_case("all") => None,
            Some(s) => Some(s.parse::<TaskStatus>()?),
        };
        let tag = self
            .tag
            .filter(|t| !t.trim().is_empty() && !t.eq_ignore_ascii_case("all"));
        let sort = match self.sort {
            Some(s) => s.parse::<PrioritySort>()?,
            None => PrioritySort::default(),
        };
        Ok(TaskQuery {
            status,
            tag,
            search: self.search,
            sort,
        })
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(params): Query<BoardParams>,
) -> AppResult<Json<TaskBoard>> {
    let query = params.into_query()?;
    let tasks = state.store.list(&session.username)?;
    Ok(Json(TaskBoard::build(&tasks, &query)))
}

#[derive(Deserialize)]
pub struct NewTaskBody {
    title: String,
    priority: Option<String>,
    due_date: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    status: Option<String>,
}

pub async fn add_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<NewTaskBody>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let priority = match body.priority {
        Some(p) => p.parse::<Priority>()?,
        None => Priority::default(),
    };
    let today = Local::now().date_naive();
    let due_date = match body.due_date {
        Some(d) => parse_due_date(&d)?,
        None => today,
    };
    // New tasks from the board are never due in the past; edits may move dates freely
    if due_date < today {
        return Err(AppError::validation("due_date", "Due date cannot be in the past."));
    }
    let mut input = NewTask::new(body.title, priority, due_date, normalize_tags(body.tags));
    if let Some(status) = body.status {
        input.status = status.parse()?;
    }

    let task = state.store.add(&session.username, input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
) -> AppResult<Json<Task>> {
    Ok(Json(state.store.get_owned(&session.username, &task_id)?))
}

#[derive(Deserialize)]
pub struct DetailsBody {
    priority: String,
    due_date: String,
    #[serde(default)]
    tags: Vec<String>,
}

pub async fn update_task_details(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
    Json(body): Json<DetailsBody>,
) -> AppResult<Json<Task>> {
    let priority: Priority = body.priority.parse()?;
    let due_date = parse_due_date(&body.due_date)?;
    state.store.get_owned(&session.username, &task_id)?;
    let task = state
        .store
        .update_details(&task_id, priority, due_date, normalize_tags(body.tags))?;
    Ok(Json(task))
}

#[derive(Deserialize)]
pub struct StatusBody {
    status: String,
}

pub async fn update_task_status(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
    Json(body): Json<StatusBody>,
) -> AppResult<Json<Task>> {
    let status: TaskStatus = body.status.parse()?;
    state.store.get_owned(&session.username, &task_id)?;
    Ok(Json(state.store.update_status(&task_id, status)?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(task_id): Path<String>,
) -> AppResult<Json<Task>> {
    state.store.get_owned(&session.username, &task_id)?;
    Ok(Json(state.store.delete(&task_id)?))
}

// Views

pub async fn calendar(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    let tasks = state.store.list(&session.username)?;
    Ok(Json(calendar_events(&tasks)))
}

pub async fn stats(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> AppResult<Json<TaskStats>> {
    let tasks = state.store.list(&session.username)?;
    Ok(Json(TaskStats::count(&tasks)))
}

// Assistant

#[derive(Serialize)]
pub struct ChatEntry {
    role: Role,
    content: String,
}

pub async fn chat_history(AuthSession(session): AuthSession) -> Json<Vec<ChatEntry>> {
    let transcript = session.transcript.lock().await;
    let entries = transcript
        .visible()
        .into_iter()
        .map(|m| ChatEntry {
            role: m.role,
            content: m.content.clone().unwrap_or_default(),
        })
        .collect();
    Json(entries)
}

#[derive(Deserialize)]
pub struct ChatBody {
    message: String,
}

pub async fn chat_turn(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Json(body): Json<ChatBody>,
) -> AppResult<Json<ChatReply>> {
    let mut transcript = session.transcript.lock().await;
    let reply = state
        .assistant
        .respond(&session.username, &mut transcript, &body.message)
        .await?;
    Ok(Json(reply))
}

pub async fn chat_clear(AuthSession(session): AuthSession) -> StatusCode {
    session.transcript.lock().await.clear();
    StatusCode::NO_CONTENT
}
