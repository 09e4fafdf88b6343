//! Session CRUD endpoints.
//!
//! - `POST   /chat`                    — create a session
//! - `GET    /chat`                    — list sessions (filter + paging)
//! - `GET    /chat/:id`                — fetch one session
//! - `PATCH  /chat/:id`                — rename
//! - `DELETE /chat/:id`                — delete session and its messages
//! - `GET    /chat/:id/with_messages`  — session plus full message log

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use super::error_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "d_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "d_true")]
    pub newest_first: bool,
}

#[derive(Debug, Deserialize)]
pub struct RenameSessionRequest {
    pub name: String,
}

fn d_limit() -> usize {
    20
}
fn d_true() -> bool {
    true
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    match state.store.create_session(body.user_id, body.name) {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(q): Query<ListSessionsQuery>,
) -> impl IntoResponse {
    let sessions =
        state
            .store
            .list_sessions(q.user_id.as_deref(), q.limit, q.offset, q.newest_first);
    Json(sessions)
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_session(&session_id) {
        Ok(session) => Json(session).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn rename_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<RenameSessionRequest>,
) -> impl IntoResponse {
    match state.store.rename_session(&session_id, &body.name) {
        Ok(session) => Json(session).into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete_session(&session_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

pub async fn get_session_with_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match state.store.get_session(&session_id) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    match state.store.list_messages(&session_id, usize::MAX, 0, true) {
        Ok(messages) => Json(serde_json::json!({
            "session": session,
            "messages": messages,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
